//! Router behaviour that never reaches MongoDB: health checks, middleware and
//! request rejection ahead of any query.

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use common::{body_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn health_check_works() {
    let app = TestApp::offline().await;

    let response = app
        .request(Request::get("/health").body(Body::empty()).unwrap())
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "bms-service");
}

#[tokio::test]
async fn responses_carry_security_headers_and_request_id() {
    let app = TestApp::offline().await;

    let response = app
        .request(
            Request::get("/health")
                .header("x-request-id", "req-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    let headers = response.headers();
    assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
    assert_eq!(headers["x-request-id"], "req-42");
}

#[tokio::test]
async fn metrics_endpoint_is_plain_text() {
    let app = TestApp::offline().await;

    let response = app
        .request(Request::get("/metrics").body(Body::empty()).unwrap())
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn protected_routes_require_a_session() {
    let app = TestApp::offline().await;

    for (method, uri) in [
        ("GET", "/api/buildings"),
        ("GET", "/api/auth/me"),
        ("POST", "/api/invoices/mark-overdue"),
        ("GET", "/api/reports/aging"),
        ("GET", "/api/feature-flags/evaluate/new-dashboard"),
    ] {
        let (status, body) = app.json(method, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        assert_eq!(body["error"], "Authentication required");
    }
}

#[tokio::test]
async fn empty_session_cookie_is_rejected() {
    let app = TestApp::offline().await;

    let (status, _) = app
        .json("GET", "/api/tenants", Some("bms_session="), None)
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_rejects_malformed_json() {
    let app = TestApp::offline().await;

    let response = app
        .request(
            Request::post("/api/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"organizationName\": "))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn register_rejects_invalid_fields() {
    let app = TestApp::offline().await;

    let (status, body) = app
        .json(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "organizationName": "Bole Heights",
                "name": "Admin",
                "email": "not-an-email",
                "password": "short",
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation error");
    let details = body["details"].as_str().unwrap();
    assert!(details.contains("email"));
    assert!(details.contains("password"));
}

#[tokio::test]
async fn login_rejects_invalid_email() {
    let app = TestApp::offline().await;

    let (status, body) = app
        .json(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "nobody", "password": "whatever-password" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation error");
}

#[tokio::test]
async fn upload_requires_a_session() {
    let app = TestApp::offline().await;
    let boundary = "bms-boundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"r.png\"\r\n\
         Content-Type: image/png\r\n\r\nPNGDATA\r\n--{b}--\r\n",
        b = boundary
    );

    let response = app
        .request(
            Request::post("/api/uploads/receipts")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", boundary),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let app = TestApp::offline().await;

    let response = app
        .request(Request::get("/api/does-not-exist").body(Body::empty()).unwrap())
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
