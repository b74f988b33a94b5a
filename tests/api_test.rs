use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use letitout::api::router;
use letitout::classifier::NoopClassifier;
use letitout::db;
use letitout::state::AppState;
use serde_json::Value;
use tower::ServiceExt;

async fn app() -> axum::Router {
    let pool = db::connect_in_memory()
        .await
        .expect("Failed to create database");
    router(AppState {
        db: pool,
        classifier: Arc::new(NoopClassifier),
        horizon_days: 30,
    })
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("body is not json")
}

fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-user-id", "alice")
        .header("x-timezone", "America/New_York");

    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[tokio::test]
async fn test_health() {
    let app = app().await;
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_missing_owner_is_unauthorized() {
    let app = app().await;
    let response = app
        .oneshot(Request::builder().uri("/todos").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_missing_timezone_is_bad_request() {
    let app = app().await;
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/recurring/regenerate")
                .header("x-user-id", "alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_todo_normalizes_due_date() {
    let app = app().await;
    let response = app
        .oneshot(request(
            "POST",
            "/todos",
            Some(serde_json::json!({ "title": "Dentist", "due_date": "2025-06-17" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = json_body(response).await;
    let due = body["due_date"].as_str().expect("due_date present");
    assert!(due.starts_with("2025-06-17T16:00:00"), "got {due}");
}

#[tokio::test]
async fn test_content_without_classifier_becomes_note() {
    let app = app().await;
    let response = app
        .oneshot(request(
            "POST",
            "/content",
            Some(serde_json::json!({ "text": "feeling good today" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = json_body(response).await;
    assert_eq!(body["type"], "note");
    assert_eq!(body["data"]["content"], "feeling good today");
}

#[tokio::test]
async fn test_recurring_lifecycle() {
    let app = app().await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/recurring",
            Some(serde_json::json!({ "title": "Stretch", "frequency": "daily" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    let id = body["definition"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["occurrences"]["created"].as_array().unwrap().len(), 31);

    let response = app
        .clone()
        .oneshot(request("GET", "/recurring/occurrences", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let occurrences = json_body(response).await;
    assert_eq!(occurrences.as_array().unwrap().len(), 31);

    let response = app
        .clone()
        .oneshot(request("DELETE", &format!("/recurring/{id}"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(request("GET", &format!("/recurring/{id}"), None))
        .await
        .unwrap();
    let definition = json_body(response).await;
    assert_eq!(definition["active"], false);

    let response = app
        .clone()
        .oneshot(request("GET", "/recurring/occurrences", None))
        .await
        .unwrap();
    let occurrences = json_body(response).await;
    assert_eq!(occurrences.as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(request("DELETE", &format!("/recurring/{id}?delete_all_future=true"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(request("GET", &format!("/recurring/{id}"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bad_due_date_on_update_keeps_stored_value() {
    let app = app().await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/todos",
            Some(serde_json::json!({ "title": "Dentist", "due_date": "2025-06-17" })),
        ))
        .await
        .unwrap();
    let created = json_body(response).await;
    let id = created["id"].as_str().unwrap().to_string();
    let stored = created["due_date"].clone();

    let response = app
        .clone()
        .oneshot(request(
            "PATCH",
            &format!("/todos/{id}"),
            Some(serde_json::json!({ "due_date": "tomorow" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(request("GET", &format!("/todos/{id}"), None))
        .await
        .unwrap();
    let item = json_body(response).await;
    assert_eq!(item["due_date"], stored);

    // 空文字は期限のクリア
    let response = app
        .oneshot(request(
            "PATCH",
            &format!("/todos/{id}"),
            Some(serde_json::json!({ "due_date": "" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let item = json_body(response).await;
    assert!(item["due_date"].is_null());
}

#[tokio::test]
async fn test_note_lifecycle() {
    let app = app().await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/content",
            Some(serde_json::json!({ "text": "remember the milk" })),
        ))
        .await
        .unwrap();
    let body = json_body(response).await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(request("GET", &format!("/notes/{id}"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(request(
            "PATCH",
            &format!("/notes/{id}"),
            Some(serde_json::json!({ "content": "remember the oat milk" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let note = json_body(response).await;
    assert_eq!(note["content"], "remember the oat milk");

    let response = app
        .clone()
        .oneshot(request(
            "PATCH",
            &format!("/notes/{id}"),
            Some(serde_json::json!({ "content": "   " })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(request("DELETE", &format!("/notes/{id}"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(request("GET", &format!("/notes/{id}"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_content_listing_combines_every_kind() {
    let app = app().await;

    for (uri, body) in [
        ("/content", serde_json::json!({ "text": "a passing thought" })),
        ("/todos", serde_json::json!({ "title": "Dentist" })),
        ("/recurring", serde_json::json!({ "title": "Stretch", "frequency": "weekly" })),
    ] {
        let response = app
            .clone()
            .oneshot(request("POST", uri, Some(body)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED, "POST {uri}");
    }

    let response = app
        .oneshot(request("GET", "/content", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let entries = json_body(response).await;
    let mut kinds: Vec<&str> = entries
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["type"].as_str().unwrap())
        .collect();
    kinds.sort();
    assert_eq!(kinds, vec!["due_item", "note", "recurring_item"]);
}

#[tokio::test]
async fn test_occurrence_toggle_and_delete_future() {
    let app = app().await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/recurring",
            Some(serde_json::json!({ "title": "Stretch", "frequency": "daily" })),
        ))
        .await
        .unwrap();
    let body = json_body(response).await;
    let definition_id = body["definition"]["id"].as_str().unwrap().to_string();

    // 新しい日付順 (DESC)
    let response = app
        .clone()
        .oneshot(request("GET", "/recurring/occurrences", None))
        .await
        .unwrap();
    let occurrences = json_body(response).await;
    let occurrences = occurrences.as_array().unwrap();
    assert_eq!(occurrences.len(), 31);

    let last_id = occurrences[0]["id"].as_str().unwrap();
    let response = app
        .clone()
        .oneshot(request(
            "PATCH",
            &format!("/recurring/occurrences/{last_id}"),
            Some(serde_json::json!({ "completed": true })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let toggled = json_body(response).await;
    assert_eq!(toggled["completed"], true);
    assert!(!toggled["completed_at"].is_null());

    // today + 5 から先を全部消す
    let cut_id = occurrences[25]["id"].as_str().unwrap();
    let response = app
        .clone()
        .oneshot(request(
            "DELETE",
            &format!("/recurring/occurrences/{cut_id}?delete_all_future=true"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let deleted = json_body(response).await;
    assert_eq!(deleted["removed"], 26);

    let response = app
        .clone()
        .oneshot(request("GET", &format!("/recurring/{definition_id}"), None))
        .await
        .unwrap();
    let definition = json_body(response).await;
    assert_eq!(definition["active"], false);

    let response = app
        .oneshot(request("GET", "/recurring/occurrences", None))
        .await
        .unwrap();
    let remaining = json_body(response).await;
    assert_eq!(remaining.as_array().unwrap().len(), 5);
}
