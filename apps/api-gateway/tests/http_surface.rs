//! HTTP-surface integration tests against an in-memory database.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use catalog_api_gateway::config::Settings;
use catalog_api_gateway::routes::build_router;
use catalog_api_gateway::state::AppState;
use catalog_infra_db::DatabaseClient;
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_settings() -> Settings {
    Settings {
        database_url: ":memory:".to_string(),
        database_auth_token: None,
        listening_port: 0,
        jwt_secret: "test-secret".to_string(),
        search_index_endpoint: None,
        search_index_api_key: None,
        upload_temp_dir: std::env::temp_dir().to_string_lossy().into_owned(),
        upload_session_max_age_minutes: 30,
        cache_max_capacity: 1_000,
    }
}

async fn test_router() -> axum::Router {
    let settings = test_settings();
    let database_client = DatabaseClient::connect(&settings.database_url, settings.database_auth_token.clone())
        .await
        .expect("in-memory database should connect");
    build_router(AppState::new(database_client, settings))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_live_requires_no_authentication() {
    let router = test_router().await;
    let response = router
        .oneshot(Request::builder().uri("/health/live").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn protected_routes_reject_missing_bearer_token() {
    let router = test_router().await;
    let response = router
        .oneshot(Request::builder().uri("/upload/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_then_login_issues_a_bearer_token() {
    let router = test_router().await;

    let register_body = json!({ "username": "alice", "password": "correct-horse-battery-staple" });
    let register_response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/register")
                .header("content-type", "application/json")
                .body(Body::from(register_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(register_response.status(), StatusCode::OK);

    let login_body = json!({ "username": "alice", "password": "correct-horse-battery-staple" });
    let login_response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .header("content-type", "application/json")
                .body(Body::from(login_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(login_response.status(), StatusCode::OK);

    let payload = body_json(login_response).await;
    assert!(payload["token"].is_string());
}

#[tokio::test]
async fn login_with_wrong_password_is_rejected() {
    let router = test_router().await;

    let register_body = json!({ "username": "bob", "password": "hunter2-hunter2" });
    router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/register")
                .header("content-type", "application/json")
                .body(Body::from(register_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let login_body = json!({ "username": "bob", "password": "wrong-password" });
    let login_response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .header("content-type", "application/json")
                .body(Body::from(login_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(login_response.status(), StatusCode::UNAUTHORIZED);
}
