#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use http_body_util::BodyExt;
use tower::ServiceExt;

use mytravel_api::identity;
use mytravel_api::session::{SESSION_COOKIE, SessionManager};
use mytravel_api::state::{AppState, AppStateInner, DbHandle};
use mytravel_api::storage::PhotoStore;
use mytravel_db::Database;

pub const BOUNDARY: &str = "mytravel-test-boundary";

/// A router over an in-memory database and a throwaway photo directory.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    photo_dir: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.photo_dir);
    }
}

pub async fn build_test_app() -> TestApp {
    let db = Arc::new(Database::open_in_memory().expect("in-memory database"));
    let db = DbHandle::new(db, Duration::from_secs(5));

    let photo_dir = std::env::temp_dir().join(format!("mytravel_it_{}", uuid::Uuid::new_v4()));
    let photos = PhotoStore::new(photo_dir.clone(), db.clone())
        .await
        .expect("photo dir");

    let state: AppState = Arc::new(AppStateInner {
        db,
        photos,
        sessions: SessionManager::new("integration-test-key"),
    });

    TestApp {
        router: mytravel_api::router::build(state.clone()),
        state,
        photo_dir,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        self.send(request("GET", uri, cookie).body(Body::empty()).unwrap())
            .await
    }

    pub async fn delete(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        self.send(request("DELETE", uri, cookie).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(
        &self,
        uri: &str,
        cookie: Option<&str>,
        body: serde_json::Value,
    ) -> Response<Body> {
        self.send(
            request("POST", uri, cookie)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn send_form(
        &self,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        form: Vec<Part>,
    ) -> Response<Body> {
        self.send(
            request(method, uri, cookie)
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(Body::from(multipart_body(&form)))
                .unwrap(),
        )
        .await
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) {
        let response = self
            .post_json(
                "/api/auth/register",
                None,
                serde_json::json!({ "name": name, "email": email, "password": password }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    /// Logs in and returns the `name=value` pair to send back as a Cookie.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .post_json(
                "/api/auth/login",
                None,
                serde_json::json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        session_cookie(&response).expect("login sets the session cookie")
    }

    /// Registers a fresh user and returns its session cookie.
    pub async fn user(&self, name: &str) -> String {
        let email = format!("{}@example.com", name);
        self.register(name, &email, "secret-pass").await;
        self.login(&email, "secret-pass").await
    }

    /// Registers a user, promotes it before logging in, and returns its cookie.
    pub async fn admin(&self, name: &str) -> String {
        let email = format!("{}@example.com", name);
        self.register(name, &email, "secret-pass").await;

        let db = self.state.db.database();
        let user = db.get_user_by_email(&email).unwrap().unwrap();
        assert!(identity::promote_to_admin(db, &user.id).unwrap());

        self.login(&email, "secret-pass").await
    }

    pub fn user_id(&self, name: &str) -> String {
        self.state
            .db
            .database()
            .get_user_by_email(&format!("{}@example.com", name))
            .unwrap()
            .unwrap()
            .id
    }
}

fn request(method: &str, uri: &str, cookie: Option<&str>) -> axum::http::request::Builder {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
}

pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter(|v| v.starts_with(&format!("{}=", SESSION_COOKIE)))
        .map(|v| v.split(';').next().unwrap_or_default().to_string())
        .next()
}

pub enum Part {
    Text(&'static str, String),
    File {
        name: &'static str,
        filename: &'static str,
        content_type: &'static str,
        data: Vec<u8>,
    },
}

pub fn text(name: &'static str, value: &str) -> Part {
    Part::Text(name, value.to_string())
}

pub fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                filename,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        name, filename, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
