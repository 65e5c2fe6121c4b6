use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{
        Method, StatusCode, Uri,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{delete, get, post},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use mytravel_types::api::ErrorResponse;

use crate::state::AppState;
use crate::{admin, auth, photos, places, reviews};

/// Largest photo accepted in a place form.
pub const MAX_PHOTO_BYTES: usize = 10 * 1024 * 1024;

/// Room for the text parts and multipart framing around the photo.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build(state: AppState) -> Router {
    // Browsers only send the session cookie cross-origin when the response
    // echoes their exact origin and allows credentials.
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true);

    Router::new()
        .route("/health", get(health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/places", get(places::list_places).post(places::create_place))
        .route(
            "/api/places/{id}",
            get(places::get_place)
                .put(places::update_place)
                .delete(places::delete_place),
        )
        .route("/api/my-places", get(places::my_places))
        .route("/api/my-places/{id}", delete(places::delete_place))
        .route("/api/reviews", get(reviews::list_reviews).post(reviews::create_review))
        .route(
            "/api/reviews/{id}",
            get(reviews::get_review).delete(reviews::delete_review),
        )
        .route("/api/my-reviews", get(reviews::my_reviews))
        .route("/api/my-reviews/{id}", delete(reviews::delete_review))
        .route("/api/photo/{id}", get(photos::get_photo))
        .route("/api/admin/users", get(admin::list_users))
        .route("/api/admin/places", get(admin::list_places))
        .route("/api/admin/delete-place/{id}", delete(admin::delete_place))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(MAX_PHOTO_BYTES + FORM_OVERHEAD_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn not_found(uri: Uri) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("route not found: {}", uri.path()),
        }),
    )
}
