//! Kakao OAuth flow
//!
//! Implements the OAuth 2.0 authorization code flow with Kakao.
//! No session is created: after login the browser is sent back to the
//! client with the user's email in the query string.

use std::panic::AssertUnwindSafe;

use axum::{
    Router,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::Engine;
use futures::FutureExt;
use rand::RngCore;
use serde::Deserialize;

use super::kakao::{self, KakaoLoginError};
use crate::AppState;
use crate::config::AppConfig;
use crate::data::User;
use crate::error::AppError;

const OAUTH_STATE_COOKIE: &str = "oauth_state";
const OAUTH_STATE_COOKIE_PATH: &str = "/auth/kakao";

/// Create authentication router
///
/// Routes:
/// - GET /auth/kakao - Redirect to Kakao
/// - GET /auth/kakao/callback - OAuth callback
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/auth/kakao", get(kakao_redirect))
        .route("/auth/kakao/callback", get(kakao_callback))
}

// =============================================================================
// Kakao OAuth
// =============================================================================

/// GET /auth/kakao
///
/// Redirects user to the Kakao authorization page.
/// With `kakao.verify_state` on, also sets the `oauth_state` cookie.
async fn kakao_redirect(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    if !state.config.kakao.verify_state {
        let url = authorize_url(&state.config, None)?;
        return Ok((jar, Redirect::to(url.as_str())));
    }

    let csrf_state = generate_csrf_state();
    let url = authorize_url(&state.config, Some(&csrf_state))?;
    let cookie = build_state_cookie(csrf_state, uses_https(&state.config));

    Ok((jar.add(cookie), Redirect::to(url.as_str())))
}

/// Query parameters from Kakao callback
#[derive(Debug, Deserialize)]
struct KakaoCallbackQuery {
    /// Authorization code
    code: Option<String>,
    /// CSRF state token, only checked when `kakao.verify_state` is on
    state: Option<String>,
}

/// GET /auth/kakao/callback
///
/// Handles OAuth callback from Kakao.
///
/// # Steps
/// 1. Verify CSRF state (when enabled)
/// 2. Exchange code for access token
/// 3. Fetch the Kakao profile
/// 4. Find or create the local user
/// 5. Redirect to the client with `?email=`
async fn kakao_callback(
    State(state): State<AppState>,
    Query(query): Query<KakaoCallbackQuery>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let jar = if state.config.kakao.verify_state {
        verify_csrf_state(query.state.as_deref(), &jar)?;
        jar.remove(clear_state_cookie())
    } else {
        jar
    };

    let Some(code) = query.code.filter(|code| !code.is_empty()) else {
        return Ok(KakaoLoginError::Generic("authorization code not provided".to_string())
            .into_response());
    };

    match guard_login(kakao::login(&state, &code)).await {
        Ok(user) => {
            tracing::info!(user_id = user.id, "Kakao login succeeded");
            let location = client_redirect_url(&state.config.client.url, &user.email);
            Ok((jar, Redirect::to(&location)).into_response())
        }
        Err(error) => Ok(error.into_response()),
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Await a login attempt; a panic inside it becomes `KakaoLoginError::Unknown`.
async fn guard_login<F>(login: F) -> Result<User, KakaoLoginError>
where
    F: Future<Output = Result<User, KakaoLoginError>>,
{
    AssertUnwindSafe(login)
        .catch_unwind()
        .await
        .unwrap_or(Err(KakaoLoginError::Unknown))
}

/// Kakao authorization URL for this client id and callback.
fn authorize_url(config: &AppConfig, csrf_state: Option<&str>) -> Result<url::Url, AppError> {
    let redirect_uri = config.kakao_redirect_uri();
    let mut params = vec![
        ("client_id", config.kakao.client_id.as_str()),
        ("redirect_uri", redirect_uri.as_str()),
        ("response_type", "code"),
    ];
    if let Some(csrf_state) = csrf_state {
        params.push(("state", csrf_state));
    }

    url::Url::parse_with_params(&config.kakao.authorize_url, &params)
        .map_err(|e| AppError::Config(format!("kakao.authorize_url is invalid: {e}")))
}

/// Where the browser lands after a successful login.
fn client_redirect_url(client_url: &str, email: &str) -> String {
    format!(
        "{}/?email={}",
        client_url.trim_end_matches('/'),
        urlencoding::encode(email)
    )
}

fn uses_https(config: &AppConfig) -> bool {
    config
        .server
        .public_url
        .to_ascii_lowercase()
        .starts_with("https://")
}

/// Generate a random CSRF state token
fn generate_csrf_state() -> String {
    let mut bytes = [0_u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn build_state_cookie(csrf_state: String, secure: bool) -> Cookie<'static> {
    Cookie::build((OAUTH_STATE_COOKIE, csrf_state))
        .path(OAUTH_STATE_COOKIE_PATH)
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

fn clear_state_cookie() -> Cookie<'static> {
    Cookie::build((OAUTH_STATE_COOKIE, ""))
        .path(OAUTH_STATE_COOKIE_PATH)
        .build()
}

/// Verify CSRF state from cookie matches callback state
fn verify_csrf_state(query_state: Option<&str>, jar: &CookieJar) -> Result<(), AppError> {
    let expected = jar
        .get(OAUTH_STATE_COOKIE)
        .map(|cookie| cookie.value())
        .filter(|value| !value.is_empty())
        .ok_or(AppError::Unauthorized)?;

    match query_state {
        Some(actual) if actual == expected => Ok(()),
        _ => {
            tracing::warn!("Kakao callback state mismatch");
            Err(AppError::Unauthorized)
        }
    }
}
