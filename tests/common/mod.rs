// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use std::sync::Arc;
use tower::ServiceExt;
use tube_accounts::config::Config;
use tube_accounts::db::FirestoreDb;
use tube_accounts::routes::create_router;
use tube_accounts::services::{MediaService, SessionService, TokenSigner};
use tube_accounts::AppState;

pub const BOUNDARY: &str = "----tube-accounts-test-boundary";

/// Create a test app with the in-memory store and mock media service.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (Router, Arc<AppState>) {
    create_test_app_with_config(Config::default())
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> (Router, Arc<AppState>) {
    let db = FirestoreDb::new_mock();
    let sessions = SessionService::new(db.clone(), TokenSigner::new(&config));

    let state = Arc::new(AppState {
        config,
        db,
        media: MediaService::new_mock(),
        sessions,
    });

    (create_router(state.clone()), state)
}

/// One part of a multipart/form-data body.
#[allow(dead_code)]
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

/// Encode parts as a multipart/form-data body using [`BOUNDARY`].
#[allow(dead_code)]
pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: {}\r\n\r\n",
                        name, file_name, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// The standard valid registration form for a user.
#[allow(dead_code)]
pub fn registration_parts<'a>(username: &'a str, email: &'a str) -> Vec<Part<'a>> {
    vec![
        Part::Text("fullName", "Test User"),
        Part::Text("email", email),
        Part::Text("username", username),
        Part::Text("password", "correct-horse-battery"),
        Part::File {
            name: "avatar",
            file_name: "avatar.png",
            content_type: "image/png",
            bytes: b"\x89PNG fake avatar bytes",
        },
    ]
}

#[allow(dead_code)]
pub async fn post_register(app: &Router, parts: &[Part<'_>]) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/users/register")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(Body::from(multipart_body(parts)))
                .unwrap(),
        )
        .await
        .unwrap()
}

#[allow(dead_code)]
pub async fn post_login(app: &Router, email: &str, password: &str) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/users/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({ "email": email, "password": password }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap()
}

/// Register `username` and return the new user's ID.
#[allow(dead_code)]
pub async fn register_user(app: &Router, username: &str, email: &str) -> String {
    let response = post_register(app, &registration_parts(username, email)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    body["data"]["id"].as_str().unwrap().to_string()
}

#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

#[allow(dead_code)]
pub fn find_cookie(headers: &[String], name: &str) -> String {
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
        .unwrap_or_else(|| panic!("missing Set-Cookie header for {name}: {headers:?}"))
}

/// Value part of a `name=value; ...` Set-Cookie header.
#[allow(dead_code)]
pub fn cookie_value(set_cookie: &str) -> String {
    set_cookie
        .split(';')
        .next()
        .and_then(|pair| pair.split_once('='))
        .map(|(_, value)| value.to_string())
        .unwrap_or_default()
}
