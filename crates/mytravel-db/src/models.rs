//! Database row types — these map directly to SQLite rows.
//! Distinct from mytravel-types API models to keep the DB layer independent.

use mytravel_types::api::{MyReviewView, PlaceView, ReviewView, UserView};
use mytravel_types::models::{Patch, PlaceRef, Role};

#[derive(Debug)]
pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Argon2 PHC string.
    pub password: String,
    pub role: Role,
    pub created_at: i64,
}

#[derive(Debug)]
pub struct SessionRow {
    pub id: String,
    pub user_id: String,
    pub role: Role,
    pub expires_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaceRow {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub photo_id: Option<String>,
    pub created_by: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Default)]
pub struct NewPlace {
    pub name: String,
    pub category: String,
    pub description: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub photo_id: Option<String>,
}

/// Partial update of a place. `created_by` and `created_at` are absent on
/// purpose: they never change after creation.
#[derive(Debug, Clone, Default)]
pub struct PlacePatch {
    pub name: Patch<String>,
    pub category: Patch<String>,
    pub description: Patch<String>,
    pub address: Patch<String>,
    pub lat: Patch<f64>,
    pub lng: Patch<f64>,
    pub photo_id: Patch<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRow {
    pub id: String,
    pub place_id: PlaceRef,
    pub user_id: String,
    pub rating: i64,
    pub comment: String,
    pub created_at: i64,
}

pub struct NewReview {
    pub place_id: PlaceRef,
    pub rating: i64,
    pub comment: String,
}

/// Result row of the reviews ⟕ places join.
#[derive(Debug, Clone, PartialEq)]
pub struct MyReviewRow {
    pub id: String,
    pub rating: i64,
    pub comment: String,
    pub place_id: PlaceRef,
    pub place_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlobRow {
    pub id: String,
    pub filename: String,
    pub content_type: String,
    pub size: i64,
    pub sha256: String,
    pub created_at: i64,
}

impl From<UserRow> for UserView {
    fn from(row: UserRow) -> Self {
        UserView {
            id: row.id,
            name: row.name,
            email: row.email,
            role: row.role,
            created_at: row.created_at,
        }
    }
}

impl From<PlaceRow> for PlaceView {
    fn from(row: PlaceRow) -> Self {
        PlaceView {
            id: row.id,
            name: row.name,
            category: row.category,
            description: row.description,
            address: row.address,
            lat: row.lat,
            lng: row.lng,
            photo_id: row.photo_id.unwrap_or_default(),
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }
}

impl From<ReviewRow> for ReviewView {
    fn from(row: ReviewRow) -> Self {
        ReviewView {
            id: row.id,
            place_id: row.place_id,
            user_id: row.user_id,
            rating: row.rating,
            comment: row.comment,
            created_at: row.created_at,
        }
    }
}

impl From<MyReviewRow> for MyReviewView {
    fn from(row: MyReviewRow) -> Self {
        MyReviewView {
            id: row.id,
            rating: row.rating,
            comment: row.comment,
            place_id: row.place_id,
            place_name: row.place_name,
        }
    }
}
