//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration files (config/default.toml, config/local.toml)
//! 3. Environment variables `MAPSHARE__SECTION__KEY`
//! 4. The flat variables `CLIENT_URL`, `SERVER_URL`, `KAKAO_CLIENT_ID`, `PORT`

use serde::Deserialize;
use std::path::PathBuf;

use crate::error::AppError;

const KAKAO_AUTHORIZE_URL: &str = "https://kauth.kakao.com/oauth/authorize";
const KAKAO_TOKEN_URL: &str = "https://kauth.kakao.com/oauth/token";
const KAKAO_PROFILE_URL: &str = "https://kapi.kakao.com/v2/user/me";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub client: ClientConfig,
    pub database: DatabaseConfig,
    pub kakao: KakaoConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Public base URL of this server, used to build the OAuth callback
    pub public_url: String,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Front-end application
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Client origin; the only CORS origin and the post-login redirect target
    pub url: String,
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
    /// Upper bound on pooled connections
    pub max_connections: u32,
}

/// Kakao OAuth configuration
#[derive(Debug, Clone, Deserialize)]
pub struct KakaoConfig {
    pub client_id: String,
    pub authorize_url: String,
    pub token_url: String,
    pub profile_url: String,
    /// Timeout for each outbound provider call
    pub request_timeout_seconds: u64,
    /// Issue and check an `oauth_state` nonce on the login round trip
    #[serde(default)]
    pub verify_state: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub fn filter_directive(&self) -> String {
        format!("mapshare={},tower_http=debug", self.level.trim())
    }

    pub fn is_json(&self) -> bool {
        self.format.trim().eq_ignore_ascii_case("json")
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Errors
    /// Returns error if configuration is missing or invalid
    pub fn load() -> Result<Self, AppError> {
        use config::{Config, Environment, File};

        let legacy = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        let config = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("database.path", "data/mapshare.db")?
            .set_default("database.max_connections", 5)?
            .set_default("kakao.authorize_url", KAKAO_AUTHORIZE_URL)?
            .set_default("kakao.token_url", KAKAO_TOKEN_URL)?
            .set_default("kakao.profile_url", KAKAO_PROFILE_URL)?
            .set_default("kakao.request_timeout_seconds", 30)?
            .set_default("kakao.verify_state", false)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("MAPSHARE")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("client.url", legacy("CLIENT_URL"))?
            .set_override_option("server.public_url", legacy("SERVER_URL"))?
            .set_override_option("kakao.client_id", legacy("KAKAO_CLIENT_ID"))?
            .set_override_option("server.port", legacy("PORT"))?
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Callback URL registered with Kakao
    pub fn kakao_redirect_uri(&self) -> String {
        format!(
            "{}/auth/kakao/callback",
            self.server.public_url.trim_end_matches('/')
        )
    }

    pub(crate) fn validate(&self) -> Result<(), AppError> {
        require_url("server.public_url", &self.server.public_url)?;
        require_url("client.url", &self.client.url)?;
        require_url("kakao.authorize_url", &self.kakao.authorize_url)?;
        require_url("kakao.token_url", &self.kakao.token_url)?;
        require_url("kakao.profile_url", &self.kakao.profile_url)?;

        if self.kakao.client_id.trim().is_empty() {
            return Err(AppError::Config(
                "kakao.client_id must not be empty".to_string(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(AppError::Config(
                "database.max_connections must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn require_url(key: &str, value: &str) -> Result<(), AppError> {
    match url::Url::parse(value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        Ok(_) => Err(AppError::Config(format!("{key} must be an http(s) URL"))),
        Err(e) => Err(AppError::Config(format!("{key} is not a valid URL: {e}"))),
    }
}
