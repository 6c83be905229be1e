mod common;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Request, StatusCode},
};
use common::{setup, unique_email};
use identity_service::build_router;
use std::net::SocketAddr;
use tower::ServiceExt;

fn client_addr() -> SocketAddr {
    "203.0.113.7:4444".parse().unwrap()
}

fn cookie_header(response: &axum::response::Response) -> String {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| {
            v.to_str()
                .unwrap()
                .split(';')
                .next()
                .unwrap()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_signup_flow_end_to_end() {
    let (state, email) = setup().await;
    let app = build_router(state).unwrap();
    let address = unique_email("flow_signup");

    // Request a signup link
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/magic-link")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(format!(
                    r#"{{"email":"{}","purpose":"signup"}}"#,
                    address
                )))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let token = email.last_token().expect("a magic link email was captured");

    // Follow the link: account is created, credentials land in cookies
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/auth/verify?token={}", token))
                .extension(ConnectInfo(client_addr()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let cookies = cookie_header(&response);
    assert!(cookies.contains("auth_access_token="));
    assert!(cookies.contains("auth_refresh_token="));

    // The cookies authenticate a protected route
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/auth/me")
                .header(header::COOKIE, &cookies)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let me: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(me["email"], address.as_str());
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_used_link_redirects_to_login_error() {
    let (state, email) = setup().await;
    let app = build_router(state).unwrap();
    let address = unique_email("flow_reuse");

    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/magic-link")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(format!(
                    r#"{{"email":"{}","purpose":"signup"}}"#,
                    address
                )))
                .unwrap(),
        )
        .await
        .unwrap();

    let token = email.last_token().unwrap();
    let verify_uri = format!("/api/auth/verify?token={}", token);

    let first = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(&verify_uri)
                .extension(ConnectInfo(client_addr()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::SEE_OTHER);

    // The second visit lands on the login page, never a second session
    let second = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(&verify_uri)
                .extension(ConnectInfo(client_addr()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let location = second.headers()[header::LOCATION].to_str().unwrap();
    assert!(location.contains("error=invalid_link"));
    assert!(second.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_login_link_not_sent_for_unknown_address() {
    let (state, email) = setup().await;
    let app = build_router(state).unwrap();
    let address = unique_email("flow_unknown");

    // Login purpose for an address with no account
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/magic-link")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(format!(
                    r#"{{"email":"{}","purpose":"login"}}"#,
                    address
                )))
                .unwrap(),
        )
        .await
        .unwrap();

    // Same generic answer as the happy path, and no mail goes out
    assert_eq!(response.status(), StatusCode::OK);
    assert!(email.sent().iter().all(|e| e.to != address));
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_protected_route_without_credentials_is_unauthorized() {
    let (state, _) = setup().await;
    let app = build_router(state).unwrap();

    let response = app
        .oneshot(Request::builder().uri("/auth/me").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
