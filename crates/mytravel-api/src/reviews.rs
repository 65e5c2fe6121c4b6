use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::info;

use mytravel_db::models::NewReview;
use mytravel_types::api::{
    CreateReviewRequest, CreatedResponse, MessageResponse, MyReviewView, ReviewQuery, ReviewView,
};

use crate::error::{ApiError, ApiResult};
use crate::extract::JsonBody;
use crate::guard::require_owner_or_admin;
use crate::middleware::CurrentUser;
use crate::state::AppState;

/// GET /api/reviews?place_id=...
///
/// An absent or empty `place_id` lists every review.
pub async fn list_reviews(
    State(state): State<AppState>,
    Query(query): Query<ReviewQuery>,
) -> ApiResult<Json<Vec<ReviewView>>> {
    let place_id = query.place_id.filter(|p| !p.is_empty());
    let rows = state
        .db
        .call(move |db| Ok(db.list_reviews(place_id.as_deref())?))
        .await?;
    Ok(Json(rows.into_iter().map(ReviewView::from).collect()))
}

/// GET /api/reviews/{id}
pub async fn get_review(
    State(state): State<AppState>,
    Path(review_id): Path<String>,
) -> ApiResult<Json<ReviewView>> {
    let review = state
        .db
        .call(move |db| Ok(db.get_review(&review_id)?))
        .await?
        .ok_or(ApiError::NotFound("review"))?;
    Ok(Json(review.into()))
}

/// POST /api/reviews
///
/// The place id is stored as given; it is not checked against existing
/// places.
pub async fn create_review(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    JsonBody(req): JsonBody<CreateReviewRequest>,
) -> ApiResult<Json<CreatedResponse>> {
    let review = NewReview {
        place_id: req.place_id,
        rating: req.rating,
        comment: req.comment,
    };

    let author = identity.user_id.clone();
    let row = state
        .db
        .call(move |db| Ok(db.insert_review(&author, &review)?))
        .await?;

    info!(
        "Review {} added by {} for place '{}'",
        row.id, identity.user_id, row.place_id.as_str()
    );
    Ok(Json(CreatedResponse {
        message: "review added".into(),
        id: row.id,
    }))
}

/// GET /api/my-reviews
pub async fn my_reviews(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> ApiResult<Json<Vec<MyReviewView>>> {
    let rows = state
        .db
        .call(move |db| Ok(db.list_reviews_with_place(&identity.user_id)?))
        .await?;
    Ok(Json(rows.into_iter().map(MyReviewView::from).collect()))
}

/// DELETE /api/reviews/{id}
pub async fn delete_review(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(review_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let lookup = review_id.clone();
    let existing = state
        .db
        .call(move |db| Ok(db.get_review(&lookup)?))
        .await?
        .ok_or(ApiError::NotFound("review"))?;
    require_owner_or_admin(&identity, &existing.user_id)?;

    let removed = state
        .db
        .call(move |db| Ok(db.delete_review(&review_id)?))
        .await?;
    if !removed {
        return Err(ApiError::NotFound("review"));
    }

    info!("Review {} deleted by {}", existing.id, identity.user_id);
    Ok(Json(MessageResponse::new("review deleted")))
}
