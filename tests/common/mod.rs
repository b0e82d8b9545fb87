//! Shared utilities for integration tests.

use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::Router;
use tower::ServiceExt;

/// Send one request through the router and collect status and body text.
pub async fn send(router: &Router, request: Request) -> (StatusCode, String) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

pub fn get(uri: &str) -> Request {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[allow(dead_code)]
pub fn post_json(uri: &str, body: &str) -> Request {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
