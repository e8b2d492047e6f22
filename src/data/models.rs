//! Data models
//!
//! Rust structs representing database entities.
//! IDs are SQLite rowids and timestamps are chrono UTC values.
//! List-valued columns (`keys`, `config`) are stored as JSON text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Key layout given to every new user
pub const DEFAULT_KEYS: [&str; 6] = ["ArrowRight", "ArrowLeft", "ArrowDown", "ArrowUp", "2", "3"];

/// Owned copy of [`DEFAULT_KEYS`]
pub fn default_keys() -> Vec<String> {
    DEFAULT_KEYS.iter().map(|key| key.to_string()).collect()
}

// =============================================================================
// User
// =============================================================================

/// A registered player
///
/// OAuth-created users carry the placeholder password `kakao-<provider id>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub password: String,
    pub created_at: DateTime<Utc>,
    /// Key-binding codes, replaced wholesale on update
    pub keys: Vec<String>,
}

/// A user together with every map they created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserWithMaps {
    #[serde(flatten)]
    pub user: User,
    #[serde(rename = "Map")]
    pub maps: Vec<Map>,
}

/// Fields supplied when creating a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password: String,
}

// =============================================================================
// Map
// =============================================================================

/// A user-authored level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Map {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Email of the owning user (foreign key)
    pub creator_email: String,
    pub rating: i64,
    /// Level data; never interpreted by the server
    pub config: Vec<i64>,
}

/// Fields supplied when creating a map
#[derive(Debug, Clone)]
pub struct NewMap {
    pub name: String,
    pub creator_email: String,
    pub config: Vec<i64>,
}

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserRow {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub password: String,
    pub created_at: DateTime<Utc>,
    pub keys: String,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let keys = serde_json::from_str(&row.keys).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("user {} has malformed keys: {e}", row.id))
        })?;

        Ok(Self {
            id: row.id,
            email: row.email,
            name: row.name,
            password: row.password,
            created_at: row.created_at,
            keys,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct MapRow {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub creator_email: String,
    pub rating: i64,
    pub config: String,
}

impl TryFrom<MapRow> for Map {
    type Error = AppError;

    fn try_from(row: MapRow) -> Result<Self, Self::Error> {
        let config = serde_json::from_str(&row.config).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("map {} has malformed config: {e}", row.id))
        })?;

        Ok(Self {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
            creator_email: row.creator_email,
            rating: row.rating,
            config,
        })
    }
}
