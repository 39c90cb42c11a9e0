#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, Response, StatusCode},
};
use clinigate::{ServerConfig, create_app, db::Database};
use tower::ServiceExt;

pub const TEST_IP: &str = "127.0.0.1";

/// Create a test app backed by an in-memory database.
pub async fn create_test_app() -> (axum::Router, Database) {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let config = ServerConfig {
        db: db.clone(),
        access_secret: b"test-access-secret-for-integration-tests".to_vec(),
        refresh_secret: b"test-refresh-secret-for-integration-tests".to_vec(),
        secure_cookies: false,
    };
    (create_app(&config), db)
}

/// Send a POST with a JSON body and optional Cookie header.
pub async fn post_json(
    app: &axum::Router,
    uri: &str,
    body: serde_json::Value,
    cookies: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-forwarded-for", TEST_IP);
    if let Some(cookies) = cookies {
        builder = builder.header("cookie", cookies);
    }
    app.clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

/// Send a PUT with a JSON body and optional Cookie header.
pub async fn put_json(
    app: &axum::Router,
    uri: &str,
    body: serde_json::Value,
    cookies: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method("PUT")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-forwarded-for", TEST_IP);
    if let Some(cookies) = cookies {
        builder = builder.header("cookie", cookies);
    }
    app.clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

/// Send a GET with an optional Cookie header.
pub async fn get(app: &axum::Router, uri: &str, cookies: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder()
        .method("GET")
        .uri(uri)
        .header("x-forwarded-for", TEST_IP);
    if let Some(cookies) = cookies {
        builder = builder.header("cookie", cookies);
    }
    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// Read and parse a JSON response body.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Extract Set-Cookie headers from a response.
pub fn extract_set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}

/// Pull the value of a named cookie out of Set-Cookie headers.
pub fn cookie_value(cookies: &[String], name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    cookies.iter().find_map(|c| {
        let rest = c.strip_prefix(&prefix)?;
        Some(rest.split(';').next().unwrap_or("").to_string())
    })
}

/// Check if cookies contain a token being cleared (Max-Age=0).
pub fn has_cleared_cookie(cookies: &[String], cookie_name: &str) -> bool {
    cookies
        .iter()
        .any(|c| c.starts_with(&format!("{}=", cookie_name)) && c.contains("Max-Age=0"))
}

/// Register a user through the API and return the session cookie pair
/// `(access_token, refresh_token)`.
pub async fn register_user(
    app: &axum::Router,
    username: &str,
    name: &str,
    email: &str,
    password: &str,
) -> (String, String) {
    let response = post_json(
        app,
        "/register",
        serde_json::json!({
            "username": username,
            "name": name,
            "email": email,
            "password": password,
        }),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let cookies = extract_set_cookies(&response);
    let access = cookie_value(&cookies, "accessToken").expect("missing access cookie");
    let refresh = cookie_value(&cookies, "refreshToken").expect("missing refresh cookie");
    (access, refresh)
}

pub fn auth_cookies(access_token: &str, refresh_token: &str) -> String {
    format!(
        "accessToken={}; refreshToken={}",
        access_token, refresh_token
    )
}

pub fn access_cookie_only(access_token: &str) -> String {
    format!("accessToken={}", access_token)
}

pub fn refresh_cookie_only(refresh_token: &str) -> String {
    format!("refreshToken={}", refresh_token)
}
