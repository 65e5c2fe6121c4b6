use serde::{Deserialize, Serialize};

use crate::models::{PlaceRef, Role};

// -- Generic bodies --

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Returned by create endpoints; carries the generated id.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub message: String,
    #[serde(rename = "_id")]
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub user_id: String,
    pub role: Role,
}

// -- Places --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceView {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    /// Empty when the place has no photo.
    pub photo_id: String,
    pub created_by: String,
    pub created_at: i64,
}

// -- Reviews --

/// Missing fields decode to their zero value, as browsers post whatever
/// the form held. `rating` is deliberately not range-checked.
#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    #[serde(default)]
    pub place_id: PlaceRef,
    #[serde(default)]
    pub rating: i64,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct ReviewQuery {
    pub place_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewView {
    #[serde(rename = "_id")]
    pub id: String,
    pub place_id: PlaceRef,
    pub user_id: String,
    pub rating: i64,
    pub comment: String,
    pub created_at: i64,
}

/// A caller's review joined with the name of the place it points at.
/// `place_name` is `None` when that place no longer exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MyReviewView {
    #[serde(rename = "_id")]
    pub id: String,
    pub rating: i64,
    pub comment: String,
    pub place_id: PlaceRef,
    pub place_name: Option<String>,
}

// -- Admin --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserView {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: i64,
}
