//! Common test utilities for E2E tests

#![allow(dead_code)]

use std::collections::HashMap;

use axum::{
    Form, Json, Router,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use mapshare::{AppState, config};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const CLIENT_URL: &str = "http://client.test";
pub const KAKAO_CLIENT_ID: &str = "test-kakao-client";
pub const KAKAO_EMAIL: &str = "kakao-player@example.com";

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        Self::with_kakao("http://127.0.0.1:9", false).await
    }

    /// Create a test server whose Kakao endpoints live under `kakao_base`.
    pub async fn with_kakao(kakao_base: &str, verify_state: bool) -> Self {
        mapshare::metrics::init_metrics();

        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        // Create test configuration
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: addr.port(),
                public_url: addr_str.clone(),
            },
            client: config::ClientConfig {
                url: CLIENT_URL.to_string(),
            },
            database: config::DatabaseConfig {
                path: db_path,
                max_connections: 5,
            },
            kakao: config::KakaoConfig {
                client_id: KAKAO_CLIENT_ID.to_string(),
                authorize_url: format!("{kakao_base}/oauth/authorize"),
                token_url: format!("{kakao_base}/oauth/token"),
                profile_url: format!("{kakao_base}/v2/user/me"),
                request_timeout_seconds: 5,
                verify_state,
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        // Initialize app state
        let state = AppState::new(config).await.unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Build router
        let app = mapshare::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Create a user through the API and return the `newUser` object
    pub async fn create_user(&self, email: &str) -> Value {
        let response = self
            .client
            .post(self.url("/users"))
            .json(&json!({
                "email": email,
                "name": "Test User",
                "password": "hunter2",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);

        let body: Value = response.json().await.unwrap();
        body["newUser"].clone()
    }

    /// Create a map through the API and return the `map` object
    pub async fn create_map(&self, name: &str, creator_email: &str) -> Value {
        let response = self
            .client
            .post(self.url("/maps"))
            .json(&json!({
                "name": name,
                "creatorEmail": creator_email,
                "config": [1, 0, 0, 2, 3],
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);

        let body: Value = response.json().await.unwrap();
        body["map"].clone()
    }

    /// Apply a rating increment and return the response
    pub async fn patch_rating(&self, id: i64, increment: i64) -> reqwest::Response {
        self.client
            .patch(self.url("/map/rating"))
            .json(&json!({ "id": id, "increment": increment }))
            .send()
            .await
            .unwrap()
    }
}

// =============================================================================
// Mock Kakao provider
// =============================================================================

/// Start a fake Kakao with token and profile endpoints; returns its base URL.
///
/// Codes understood by the token endpoint:
/// - `good`: token for a complete profile
/// - `no-email`: token for a profile without email
/// - anything else: 400 `invalid_grant`
pub async fn spawn_mock_kakao() -> String {
    let app = Router::new()
        .route("/oauth/token", post(mock_token))
        .route("/v2/user/me", get(mock_profile));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

async fn mock_token(Form(form): Form<HashMap<String, String>>) -> impl IntoResponse {
    if form.get("grant_type").map(String::as_str) != Some("authorization_code")
        || form.get("client_id").map(String::as_str) != Some(KAKAO_CLIENT_ID)
        || !form
            .get("redirect_uri")
            .is_some_and(|uri| uri.ends_with("/auth/kakao/callback"))
    {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_request" })),
        );
    }

    match form.get("code").map(String::as_str) {
        Some("good") => (StatusCode::OK, Json(json!({ "access_token": "token-good" }))),
        Some("no-email") => (
            StatusCode::OK,
            Json(json!({ "access_token": "token-no-email" })),
        ),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant" })),
        ),
    }
}

async fn mock_profile(headers: HeaderMap) -> impl IntoResponse {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    match auth {
        "Bearer token-good" => (
            StatusCode::OK,
            Json(json!({
                "id": 4242,
                "kakao_account": {
                    "email": KAKAO_EMAIL,
                    "profile": { "nickname": "KakaoPlayer" }
                }
            })),
        ),
        "Bearer token-no-email" => (
            StatusCode::OK,
            Json(json!({
                "id": 77,
                "kakao_account": { "profile": { "nickname": "Shy" } }
            })),
        ),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "msg": "this access token does not exist", "code": -401 })),
        ),
    }
}
