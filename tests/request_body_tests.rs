// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request body handling: size cap, malformed JSON, timeouts, and static fallback.

use axum::{
    body::{Body, Bytes},
    http::{header, Request, StatusCode},
};
use serde_json::json;
use std::time::Duration;
use tower::ServiceExt;
use user_registry::config::Config;

mod common;

#[tokio::test]
async fn test_body_over_limit_rejected() {
    let config = Config {
        body_limit_bytes: 256,
        ..Config::default()
    };
    let (app, _) = common::create_test_app_with(config).await;

    let photo = "A".repeat(1024);
    let (status, body) = common::send(
        &app,
        "POST",
        "/api/users",
        Some(json!({"login": "a", "password": "p", "name": "A", "profilePhoto": photo})),
    )
    .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body["error"].is_string());

    let (_, users) = common::send(&app, "GET", "/api/users", None).await;
    assert!(users.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_large_photo_within_default_limit_accepted() {
    let (app, _) = common::create_test_app().await;

    let photo = "A".repeat(4 * 1024 * 1024);
    let (status, user) = common::send(
        &app,
        "POST",
        "/api/users",
        Some(json!({
            "login": "a",
            "password": "p",
            "name": "A",
            "profilePhoto": photo,
            "photoMimeType": "image/png"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["profilePhoto"].as_str().unwrap().len(), 4 * 1024 * 1024);
}

#[tokio::test]
async fn test_malformed_json_rejected() {
    let (app, _) = common::create_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/users")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].is_string());
}

/// Send a raw body with an optional content type.
async fn send_raw(
    app: &axum::Router,
    method: &str,
    uri: &str,
    content_type: Option<&str>,
    body: Body,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_missing_content_type_reads_as_empty_body() {
    let (app, _) = common::create_test_app().await;

    let (status, body) = send_raw(
        &app,
        "POST",
        "/api/users",
        None,
        Body::from(r#"{"login":"a","password":"p","name":"A"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "All fields required"}));
}

#[tokio::test]
async fn test_form_body_rejected_as_missing_fields() {
    let (app, _) = common::create_test_app().await;

    let (status, body) = send_raw(
        &app,
        "POST",
        "/api/users",
        Some("application/x-www-form-urlencoded"),
        Body::from("login=a&password=p&name=A"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "All fields required"}));

    let (_, users) = common::send(&app, "GET", "/api/users", None).await;
    assert!(users.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_wrongly_typed_field_rejected() {
    let (app, _) = common::create_test_app().await;

    let (status, body) = common::send(
        &app,
        "POST",
        "/api/users",
        Some(json!({"login": 5, "password": "p", "name": "A"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Error creating user"}));

    common::send(
        &app,
        "POST",
        "/api/users",
        Some(json!({"login": "a", "password": "p", "name": "A"})),
    )
    .await;

    let (status, body) = common::send(
        &app,
        "PUT",
        "/api/users/1",
        Some(json!({"name": ["not", "a", "string"]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Error updating user"}));
}

#[tokio::test]
async fn test_update_without_content_type_changes_nothing() {
    let (app, _) = common::create_test_app().await;

    common::send(
        &app,
        "POST",
        "/api/users",
        Some(json!({"login": "a", "password": "p", "name": "A"})),
    )
    .await;

    let (status, user) = send_raw(
        &app,
        "PUT",
        "/api/users/1",
        None,
        Body::from(r#"{"name":"ignored"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["name"], "A");

    let (status, body) = send_raw(&app, "PUT", "/api/users/9", None, Body::empty()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "User not found"}));
}

#[tokio::test]
async fn test_stalled_request_times_out() {
    let config = Config {
        request_timeout: Duration::from_millis(50),
        ..Config::default()
    };
    let (app, _) = common::create_test_app_with(config).await;

    // A body that never arrives keeps the JSON extractor waiting.
    let stalled = futures_util::stream::pending::<Result<Bytes, std::io::Error>>();

    let (status, body) = send_raw(
        &app,
        "POST",
        "/api/users",
        Some("application/json"),
        Body::from_stream(stalled),
    )
    .await;

    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(body, json!({"error": "Request timed out"}));
}

#[tokio::test]
async fn test_static_client_served_at_root() {
    let config = Config {
        static_dir: concat!(env!("CARGO_MANIFEST_DIR"), "/public").to_string(),
        ..Config::default()
    };
    let (app, _) = common::create_test_app_with(config).await;

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get(header::CONTENT_TYPE).unwrap();
    assert!(content_type.to_str().unwrap().starts_with("text/html"));
    assert!(response.headers().get("Content-Security-Policy").is_some());
}
