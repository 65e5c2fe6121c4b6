//! Admin-only views over every user and place.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::info;

use mytravel_types::api::{MessageResponse, PlaceView, UserView};

use crate::error::ApiResult;
use crate::guard::require_admin;
use crate::identity;
use crate::middleware::CurrentUser;
use crate::places::{load_place, remove_place};
use crate::state::AppState;

/// GET /api/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
) -> ApiResult<Json<Vec<UserView>>> {
    require_admin(&caller)?;
    let users = state.db.call(|db| Ok(identity::list_users(db)?)).await?;
    Ok(Json(users))
}

/// GET /api/admin/places
pub async fn list_places(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
) -> ApiResult<Json<Vec<PlaceView>>> {
    require_admin(&caller)?;
    let rows = state.db.call(|db| Ok(db.list_places()?)).await?;
    Ok(Json(rows.into_iter().map(PlaceView::from).collect()))
}

/// DELETE /api/admin/delete-place/{id}
pub async fn delete_place(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(place_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    require_admin(&caller)?;
    let existing = load_place(&state, place_id).await?;
    remove_place(&state, existing.id.clone()).await?;

    info!(
        "Admin {} deleted place {} owned by {}",
        caller.user_id, existing.id, existing.created_by
    );
    Ok(Json(MessageResponse::new("place deleted")))
}
