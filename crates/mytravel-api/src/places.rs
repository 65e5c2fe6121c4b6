use axum::{
    Json,
    extract::{
        Multipart, Path, State,
        multipart::{Field, MultipartError},
    },
};
use bytes::Bytes;
use futures_util::{StreamExt, stream};
use tracing::{info, warn};

use mytravel_db::models::{NewPlace, PlacePatch, PlaceRow};
use mytravel_types::api::{CreatedResponse, MessageResponse, PlaceView};
use mytravel_types::models::Patch;

use crate::error::{ApiError, ApiResult};
use crate::guard::require_owner_or_admin;
use crate::middleware::CurrentUser;
use crate::state::AppState;
use crate::storage::PhotoStore;

/// Raw multipart form for create and update. `None` means the part was not
/// sent at all.
#[derive(Debug, Default)]
pub struct PlaceForm {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub lat: Option<String>,
    pub lng: Option<String>,
    pub photo_id: Option<String>,
}

/// GET /api/places
pub async fn list_places(State(state): State<AppState>) -> ApiResult<Json<Vec<PlaceView>>> {
    let rows = state.db.call(|db| Ok(db.list_places()?)).await?;
    Ok(Json(rows.into_iter().map(PlaceView::from).collect()))
}

/// GET /api/my-places: places created by the caller.
pub async fn my_places(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> ApiResult<Json<Vec<PlaceView>>> {
    let rows = state
        .db
        .call(move |db| Ok(db.list_places_by_owner(&identity.user_id)?))
        .await?;
    Ok(Json(rows.into_iter().map(PlaceView::from).collect()))
}

/// GET /api/places/{id}
pub async fn get_place(
    State(state): State<AppState>,
    Path(place_id): Path<String>,
) -> ApiResult<Json<PlaceView>> {
    let place = load_place(&state, place_id).await?;
    Ok(Json(place.into()))
}

/// POST /api/places, multipart. `name`, `lat` and `lng` are required, the
/// photo is optional.
pub async fn create_place(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    multipart: Multipart,
) -> ApiResult<Json<CreatedResponse>> {
    let form = read_place_form(&state.photos, multipart).await?;
    let place = new_place_from_form(form)?;

    let owner = identity.user_id.clone();
    let row = state
        .db
        .call(move |db| Ok(db.insert_place(&owner, &place)?))
        .await?;

    info!("Place {} created by {}", row.id, identity.user_id);
    Ok(Json(CreatedResponse {
        message: "place created".into(),
        id: row.id,
    }))
}

/// PUT /api/places/{id}, multipart partial update. Parts that are not sent
/// keep their stored value.
pub async fn update_place(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(place_id): Path<String>,
    multipart: Multipart,
) -> ApiResult<Json<MessageResponse>> {
    let existing = load_place(&state, place_id).await?;
    require_owner_or_admin(&identity, &existing.created_by)?;

    let form = read_place_form(&state.photos, multipart).await?;
    let patch = patch_from_form(form)?;

    let id = existing.id.clone();
    let updated = state
        .db
        .call(move |db| Ok(db.update_place(&id, &patch)?))
        .await?;
    if !updated {
        // deleted between the ownership check and the write
        return Err(ApiError::NotFound("place"));
    }

    info!("Place {} updated by {}", existing.id, identity.user_id);
    Ok(Json(MessageResponse::new("place updated")))
}

/// DELETE /api/places/{id} and /api/my-places/{id}.
///
/// Reviews pointing at the place and its photo blob are left as they are.
pub async fn delete_place(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(place_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let existing = load_place(&state, place_id).await?;
    require_owner_or_admin(&identity, &existing.created_by)?;

    remove_place(&state, existing.id.clone()).await?;

    info!("Place {} deleted by {}", existing.id, identity.user_id);
    Ok(Json(MessageResponse::new("place deleted")))
}

pub(crate) async fn load_place(state: &AppState, place_id: String) -> ApiResult<PlaceRow> {
    state
        .db
        .call(move |db| Ok(db.get_place(&place_id)?))
        .await?
        .ok_or(ApiError::NotFound("place"))
}

pub(crate) async fn remove_place(state: &AppState, place_id: String) -> ApiResult<()> {
    let removed = state
        .db
        .call(move |db| Ok(db.delete_place(&place_id)?))
        .await?;
    if removed {
        Ok(())
    } else {
        Err(ApiError::NotFound("place"))
    }
}

/// Collects the text parts and streams a non-empty `photo` part into the
/// photo store as it arrives.
async fn read_place_form(photos: &PhotoStore, mut multipart: Multipart) -> ApiResult<PlaceForm> {
    let mut form = PlaceForm::default();

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "photo" => {
                let filename = field.file_name().unwrap_or("photo").to_string();
                let declared = field.content_type().map(str::to_string);

                // An empty file input still produces a part; it means "no photo".
                let Some(first) = first_non_empty_chunk(&mut field).await? else {
                    continue;
                };
                let body = stream::iter([Ok::<_, MultipartError>(first)]).chain(field);
                let blob = photos.upload(&filename, declared.as_deref(), body).await?;
                form.photo_id = Some(blob.id);
            }
            "name" => form.name = Some(field.text().await?),
            "category" => form.category = Some(field.text().await?),
            "description" => form.description = Some(field.text().await?),
            "address" => form.address = Some(field.text().await?),
            "lat" => form.lat = Some(field.text().await?),
            "lng" => form.lng = Some(field.text().await?),
            other => warn!("Ignoring unexpected form field '{}'", other),
        }
    }

    Ok(form)
}

/// Skips zero-length chunks; `None` once the part is exhausted without data.
async fn first_non_empty_chunk(field: &mut Field<'_>) -> ApiResult<Option<Bytes>> {
    while let Some(chunk) = field.chunk().await? {
        if !chunk.is_empty() {
            return Ok(Some(chunk));
        }
    }
    Ok(None)
}

pub fn new_place_from_form(form: PlaceForm) -> ApiResult<NewPlace> {
    let name = form
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::InvalidInput("name, lat and lng are required".into()))?;

    let lat = parse_coordinate("lat", form.lat.as_deref())?
        .ok_or_else(|| ApiError::InvalidInput("name, lat and lng are required".into()))?;
    let lng = parse_coordinate("lng", form.lng.as_deref())?
        .ok_or_else(|| ApiError::InvalidInput("name, lat and lng are required".into()))?;

    Ok(NewPlace {
        name,
        category: form.category.unwrap_or_default(),
        description: form.description.unwrap_or_default(),
        address: form.address.unwrap_or_default(),
        lat,
        lng,
        photo_id: form.photo_id,
    })
}

/// Omitted parts become `Keep`. An empty text part clears the field, except
/// `name` which may not be blank and the coordinates, where an empty input
/// keeps the stored value.
pub fn patch_from_form(form: PlaceForm) -> ApiResult<PlacePatch> {
    let name = match form.name.map(|n| n.trim().to_string()) {
        None => Patch::Keep,
        Some(n) if n.is_empty() => {
            return Err(ApiError::InvalidInput("name cannot be empty".into()));
        }
        Some(n) => Patch::Set(n),
    };

    Ok(PlacePatch {
        name,
        category: text_patch(form.category),
        description: text_patch(form.description),
        address: text_patch(form.address),
        lat: parse_coordinate("lat", form.lat.as_deref())?.map_or(Patch::Keep, Patch::Set),
        lng: parse_coordinate("lng", form.lng.as_deref())?.map_or(Patch::Keep, Patch::Set),
        photo_id: form.photo_id.map_or(Patch::Keep, Patch::Set),
    })
}

fn text_patch(value: Option<String>) -> Patch<String> {
    match value {
        None => Patch::Keep,
        Some(v) if v.is_empty() => Patch::Clear,
        Some(v) => Patch::Set(v),
    }
}

/// `None` for a missing or blank value; an error for anything that is not a
/// finite number.
fn parse_coordinate(field: &str, raw: Option<&str>) -> ApiResult<Option<f64>> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(None);
    };
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(ApiError::InvalidInput(format!("invalid {}: '{}'", field, raw))),
    }
}
