//! HTTP-level tests for reviews and the "my reviews" join.

mod common;

use axum::http::StatusCode;
use common::{TestApp, body_json, build_test_app, text};
use serde_json::json;

async fn add_review(app: &TestApp, cookie: &str, place_id: &str, rating: i64) -> String {
    let response = app
        .post_json(
            "/api/reviews",
            Some(cookie),
            json!({ "place_id": place_id, "rating": rating, "comment": "nice" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "review added");
    json["_id"].as_str().unwrap().to_string()
}

async fn add_place(app: &TestApp, cookie: &str, name: &str) -> String {
    let response = app
        .send_form(
            "POST",
            "/api/places",
            Some(cookie),
            vec![text("name", name), text("lat", "1"), text("lng", "2")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn creating_a_review_requires_login() {
    let app = build_test_app().await;
    let response = app
        .post_json("/api/reviews", None, json!({ "place_id": "p", "rating": 3 }))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn rating_is_stored_as_given() {
    let app = build_test_app().await;
    let cookie = app.user("ana").await;
    let id = add_review(&app, &cookie, "anything", 42).await;

    let json = body_json(app.get(&format!("/api/reviews/{}", id), None).await).await;
    assert_eq!(json["rating"], 42);
    assert_eq!(json["place_id"], "anything");
    assert_eq!(json["user_id"], app.user_id("ana"));
}

#[tokio::test]
async fn reviews_filter_by_place() {
    let app = build_test_app().await;
    let cookie = app.user("ana").await;
    add_review(&app, &cookie, "p1", 5).await;
    add_review(&app, &cookie, "p1", 4).await;
    add_review(&app, &cookie, "p2", 1).await;

    let all = body_json(app.get("/api/reviews", None).await).await;
    assert_eq!(all.as_array().unwrap().len(), 3);

    let empty_filter = body_json(app.get("/api/reviews?place_id=", None).await).await;
    assert_eq!(empty_filter.as_array().unwrap().len(), 3);

    let p1 = body_json(app.get("/api/reviews?place_id=p1", None).await).await;
    let p1 = p1.as_array().unwrap();
    assert_eq!(p1.len(), 2);
    assert!(p1.iter().all(|r| r["place_id"] == "p1"));

    let none = body_json(app.get("/api/reviews?place_id=p3", None).await).await;
    assert_eq!(none, json!([]));
}

#[tokio::test]
async fn my_reviews_keeps_reviews_of_deleted_places() {
    let app = build_test_app().await;
    let cookie = app.user("ana").await;
    let kept = add_place(&app, &cookie, "Museum").await;
    let doomed = add_place(&app, &cookie, "Pier").await;
    add_review(&app, &cookie, &kept, 5).await;
    let orphan = add_review(&app, &cookie, &doomed, 2).await;

    let response = app
        .delete(&format!("/api/places/{}", doomed), Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(app.get("/api/my-reviews", Some(&cookie)).await).await;
    let rows = json.as_array().unwrap();
    assert_eq!(rows.len(), 2);

    let orphan_row = rows.iter().find(|r| r["_id"] == orphan.as_str()).unwrap();
    assert!(orphan_row["place_name"].is_null());
    assert_eq!(orphan_row["place_id"], doomed);

    let kept_row = rows.iter().find(|r| r["place_id"] == kept.as_str()).unwrap();
    assert_eq!(kept_row["place_name"], "Museum");
}

#[tokio::test]
async fn my_reviews_excludes_other_users() {
    let app = build_test_app().await;
    let ana = app.user("ana").await;
    let bob = app.user("bob").await;
    add_review(&app, &bob, "p", 3).await;

    let json = body_json(app.get("/api/my-reviews", Some(&ana)).await).await;
    assert_eq!(json, json!([]));
    assert_eq!(
        app.get("/api/my-reviews", None).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn only_author_or_admin_may_delete_a_review() {
    let app = build_test_app().await;
    let ana = app.user("ana").await;
    let bob = app.user("bob").await;
    let admin = app.admin("root").await;

    let first = add_review(&app, &ana, "p", 3).await;
    let second = add_review(&app, &ana, "p", 4).await;

    let response = app.delete(&format!("/api/reviews/{}", first), Some(&bob)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .delete(&format!("/api/my-reviews/{}", first), Some(&ana))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "review deleted");

    let response = app
        .delete(&format!("/api/reviews/{}", second), Some(&admin))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.delete(&format!("/api/reviews/{}", second), Some(&ana)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "review not found");
}
