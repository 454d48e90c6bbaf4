// Request-pipeline tests driven against the real router in-process.
// No database is needed: every request here is stopped by the rate
// limiter, the session authenticator, or input validation before any
// persistence call.

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use campus_api::app;

async fn body_json(response: axum::response::Response) -> Result<Value> {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[tokio::test]
async fn root_banner_responds() -> Result<()> {
    let response = app()
        .oneshot(Request::builder().uri("/").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "Campus API");
    Ok(())
}

#[tokio::test]
async fn protected_route_without_session_is_unauthenticated() -> Result<()> {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api/timetables")
                .header("x-forwarded-for", "198.51.100.10")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await?;
    assert_eq!(body["error"], "UNAUTHENTICATED");
    assert!(body["request_id"].as_str().is_some());
    assert!(body["timestamp"].as_str().unwrap().contains('T'));
    Ok(())
}

#[tokio::test]
async fn garbage_bearer_token_is_rejected() -> Result<()> {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api/auth/whoami")
                .header("authorization", "Bearer not-a-real-token")
                .header("x-forwarded-for", "198.51.100.11")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await?;
    assert_eq!(body["error"], "UNAUTHENTICATED");
    Ok(())
}

#[tokio::test]
async fn responses_carry_request_id() -> Result<()> {
    let response = app()
        .oneshot(Request::builder().uri("/").body(Body::empty())?)
        .await?;
    assert!(response.headers().get("x-request-id").is_some());

    // An inbound id is honored
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/")
                .header("x-request-id", "trace-me-42")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(
        response.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("trace-me-42")
    );
    Ok(())
}

#[tokio::test]
async fn error_envelope_reuses_the_request_id_header() -> Result<()> {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api/timetables")
                .header("x-request-id", "rid-123")
                .header("x-forwarded-for", "198.51.100.16")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("rid-123")
    );
    // Header and body carry the same id
    let body = body_json(response).await?;
    assert_eq!(body["request_id"], "rid-123");
    Ok(())
}

#[tokio::test]
async fn invalid_login_payload_fails_validation() -> Result<()> {
    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .header("content-type", "application/json")
                .header("x-forwarded-for", "198.51.100.12")
                .body(Body::from(r#"{"email": "not-an-email"}"#))?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await?;
    assert_eq!(body["error"], "VALIDATION_ERROR");
    let details = body["details"].as_array().expect("field errors present");
    assert!(!details.is_empty());
    Ok(())
}

#[tokio::test]
async fn auth_class_rate_limit_trips_with_429() -> Result<()> {
    // The development auth preset allows 10 requests per minute; the
    // limiter state is per client identifier, so a dedicated IP keeps
    // this test isolated from the others.
    let client_ip = "203.0.113.77";
    let limit = campus_api::config::config().rate_limit.auth.max_requests;

    for _ in 0..limit {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/auth/login")
                    .header("content-type", "application/json")
                    .header("x-forwarded-for", client_ip)
                    .body(Body::from("{}"))?,
            )
            .await?;
        // Under the threshold: rejected by validation, not the limiter
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .header("content-type", "application/json")
                .header("x-forwarded-for", client_ip)
                .body(Body::from("{}"))?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().get("retry-after").is_some());
    let body = body_json(response).await?;
    assert_eq!(body["error"], "RATE_LIMITED");
    Ok(())
}

#[tokio::test]
async fn allowed_requests_expose_rate_limit_headers() -> Result<()> {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/")
                .header("x-forwarded-for", "198.51.100.13")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("x-ratelimit-limit").is_some());
    assert!(response.headers().get("x-ratelimit-remaining").is_some());
    assert!(response.headers().get("x-ratelimit-reset").is_some());
    Ok(())
}

#[tokio::test]
async fn malformed_identifier_without_session_stops_at_authenticator() -> Result<()> {
    // Identifier parsing happens in the handler, after authentication;
    // without a session the pipeline ends at 401 before the bad id is
    // ever looked at.
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api/timetables/not-a-hex-id")
                .header("x-forwarded-for", "198.51.100.14")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn content_and_finance_routes_require_a_session() -> Result<()> {
    for path in [
        "/api/events",
        "/api/posts",
        "/api/notifications",
        "/api/messages",
        "/api/feedback",
        "/api/expenses",
        "/api/fee-structures",
        "/api/academic-config",
    ] {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri(path)
                    .header("x-forwarded-for", "198.51.100.20")
                    .body(Body::empty())?,
            )
            .await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", path);
    }
    Ok(())
}

#[tokio::test]
async fn unknown_route_is_404() -> Result<()> {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api/nope")
                .header("x-forwarded-for", "198.51.100.15")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}
