pub mod admin;
pub mod auth;
pub mod error;
pub mod extract;
pub mod guard;
pub mod identity;
pub mod middleware;
pub mod photos;
pub mod places;
pub mod reviews;
pub mod router;
pub mod session;
pub mod state;
pub mod storage;
