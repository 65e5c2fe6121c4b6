use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
};

use crate::error::ApiResult;
use crate::state::AppState;

/// GET /api/photo/{id}: streams the stored bytes back unchanged.
///
/// Blobs never change once written, so the response is cacheable and the
/// content hash doubles as the ETag.
pub async fn get_photo(
    State(state): State<AppState>,
    Path(photo_id): Path<String>,
) -> ApiResult<(StatusCode, HeaderMap, Body)> {
    let (blob, stream) = state.photos.open(&photo_id).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&blob.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(blob.size.max(0) as u64));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=86400, immutable"),
    );
    if let Ok(etag) = HeaderValue::from_str(&format!("\"{}\"", blob.sha256)) {
        headers.insert(header::ETAG, etag);
    }

    Ok((StatusCode::OK, headers, Body::from_stream(stream)))
}
