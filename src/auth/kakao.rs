//! Kakao identity provider calls
//!
//! Authorization code → access token → profile → local user.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use thiserror::Error;

use crate::AppState;
use crate::data::{NewUser, User};
use crate::error::AppError;

/// Why a login attempt failed
///
/// All variants answer 500; the numbered message only tells the paths apart
/// in logs and bug reports.
#[derive(Debug, Error)]
pub enum KakaoLoginError {
    /// A call to Kakao failed or returned a non-2xx status
    #[error("Kakao request failed: {detail}")]
    Provider { detail: serde_json::Value },

    /// Anything else that went wrong in our own handling
    #[error("{0}")]
    Generic(String),

    /// The login task panicked
    #[error("Unknown error")]
    Unknown,
}

impl KakaoLoginError {
    pub fn code(&self) -> u8 {
        match self {
            Self::Provider { .. } => 1,
            Self::Generic(_) => 2,
            Self::Unknown => 3,
        }
    }

    fn outcome_label(&self) -> &'static str {
        match self {
            Self::Provider { .. } => "provider_error",
            Self::Generic(_) => "generic_error",
            Self::Unknown => "unknown_error",
        }
    }

    fn detail(&self) -> serde_json::Value {
        match self {
            Self::Provider { detail } => detail.clone(),
            Self::Generic(message) => serde_json::Value::String(message.clone()),
            Self::Unknown => serde_json::Value::String("Unknown error".to_string()),
        }
    }
}

impl From<reqwest::Error> for KakaoLoginError {
    fn from(error: reqwest::Error) -> Self {
        Self::Provider {
            detail: serde_json::Value::String(error.to_string()),
        }
    }
}

impl From<AppError> for KakaoLoginError {
    fn from(error: AppError) -> Self {
        Self::Generic(error.to_string())
    }
}

impl IntoResponse for KakaoLoginError {
    fn into_response(self) -> Response {
        let detail = self.detail();
        match &self {
            Self::Provider { .. } => {
                tracing::error!(error = %detail, "Provider error during Kakao login");
            }
            Self::Generic(_) => tracing::error!(error = %detail, "Generic error during Kakao login"),
            Self::Unknown => tracing::error!("Unknown error during Kakao login"),
        }

        crate::metrics::KAKAO_LOGINS_TOTAL
            .with_label_values(&[self.outcome_label()])
            .inc();

        let body = Json(serde_json::json!({
            "message": format!("Kakao Login failed {}", self.code()),
            "error": detail,
        }));

        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

/// Kakao token response
#[derive(Debug, Deserialize)]
struct KakaoTokenResponse {
    access_token: String,
}

/// Kakao `/v2/user/me` payload
#[derive(Debug, Deserialize)]
struct KakaoUser {
    id: i64,
    kakao_account: Option<KakaoAccount>,
}

#[derive(Debug, Deserialize)]
struct KakaoAccount {
    email: Option<String>,
    profile: Option<KakaoProfile>,
}

#[derive(Debug, Deserialize)]
struct KakaoProfile {
    nickname: Option<String>,
}

/// Account details needed to find or create the local user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KakaoIdentity {
    pub id: i64,
    pub email: String,
    pub nickname: String,
}

impl KakaoIdentity {
    /// Non-secret stand-in password stored for Kakao users.
    pub fn placeholder_password(&self) -> String {
        format!("kakao-{}", self.id)
    }
}

impl TryFrom<KakaoUser> for KakaoIdentity {
    type Error = KakaoLoginError;

    fn try_from(user: KakaoUser) -> Result<Self, Self::Error> {
        let account = user
            .kakao_account
            .ok_or_else(|| KakaoLoginError::Generic("kakao_account missing".to_string()))?;
        let email = account
            .email
            .ok_or_else(|| KakaoLoginError::Generic("kakao_account.email missing".to_string()))?;
        let nickname = account
            .profile
            .and_then(|profile| profile.nickname)
            .ok_or_else(|| {
                KakaoLoginError::Generic("kakao_account.profile.nickname missing".to_string())
            })?;

        Ok(Self {
            id: user.id,
            email,
            nickname,
        })
    }
}

/// Read a successful JSON body, or turn a non-2xx answer into a provider error.
async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, KakaoLoginError> {
    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
        let detail = serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            serde_json::Value::String(format!(
                "{status}: {}",
                String::from_utf8_lossy(&bytes)
            ))
        });
        return Err(KakaoLoginError::Provider { detail });
    }

    serde_json::from_slice(&bytes)
        .map_err(|e| KakaoLoginError::Generic(format!("unexpected Kakao payload: {e}")))
}

/// Exchange an authorization code for an access token.
async fn exchange_code(state: &AppState, code: &str) -> Result<String, KakaoLoginError> {
    let redirect_uri = state.config.kakao_redirect_uri();
    let response = state
        .http_client
        .post(&state.config.kakao.token_url)
        .form(&[
            ("grant_type", "authorization_code"),
            ("client_id", state.config.kakao.client_id.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("code", code),
        ])
        .send()
        .await?;

    let token: KakaoTokenResponse = read_json(response).await?;
    Ok(token.access_token)
}

/// Fetch the account behind an access token.
async fn fetch_identity(
    state: &AppState,
    access_token: &str,
) -> Result<KakaoIdentity, KakaoLoginError> {
    let response = state
        .http_client
        .get(&state.config.kakao.profile_url)
        .bearer_auth(access_token)
        .send()
        .await?;

    let user: KakaoUser = read_json(response).await?;
    KakaoIdentity::try_from(user)
}

/// Run the whole login and return the local user.
pub async fn login(state: &AppState, code: &str) -> Result<User, KakaoLoginError> {
    let access_token = exchange_code(state, code).await?;
    let identity = fetch_identity(state, &access_token).await?;
    tracing::debug!(kakao_id = identity.id, "Fetched Kakao profile");

    let user = state
        .db
        .find_or_create_user(&NewUser {
            email: identity.email.clone(),
            name: identity.nickname.clone(),
            password: identity.placeholder_password(),
        })
        .await?;

    crate::metrics::KAKAO_LOGINS_TOTAL
        .with_label_values(&["success"])
        .inc();

    Ok(user)
}
