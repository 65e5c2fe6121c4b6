use axum::extract::FromRequest;

use crate::error::ApiError;

/// `axum::Json` whose rejection renders as our `{"error": ...}` body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);
