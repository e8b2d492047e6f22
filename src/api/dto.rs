//! Request and response DTOs
//!
//! Field names follow the JSON the game client already speaks
//! (`creatorEmail`, `newUser`, `mapCount`, ...).

use serde::{Deserialize, Serialize};

use crate::data::{Map, NewMap, NewUser, UserWithMaps};

// =============================================================================
// Requests
// =============================================================================

/// Body of `POST /users`
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub name: String,
    /// Older clients send the misspelled `passward`
    #[serde(alias = "passward")]
    pub password: String,
}

impl From<CreateUserRequest> for NewUser {
    fn from(request: CreateUserRequest) -> Self {
        Self {
            email: request.email,
            name: request.name,
            password: request.password,
        }
    }
}

/// `?email=` query, also used as the `POST /maps/email` body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailFilter {
    pub email: Option<String>,
}

impl EmailFilter {
    /// The email, treating an empty value as absent.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().filter(|email| !email.is_empty())
    }
}

/// Body of `POST /maps`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMapRequest {
    pub name: String,
    pub creator_email: String,
    pub config: Vec<i64>,
}

impl From<CreateMapRequest> for NewMap {
    fn from(request: CreateMapRequest) -> Self {
        Self {
            name: request.name,
            creator_email: request.creator_email,
            config: request.config,
        }
    }
}

/// `?id=` query of `GET /map`; kept as text and parsed leniently
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MapIdQuery {
    pub id: Option<String>,
}

/// Body of `PATCH /map/rating`
#[derive(Debug, Clone, Deserialize)]
pub struct RatingUpdateRequest {
    pub id: i64,
    /// Signed delta added to the current rating
    pub increment: i64,
}

/// Body of `PUT /keys`
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateKeysRequest {
    pub email: String,
    pub keys: Vec<String>,
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedUserResponse {
    pub new_user: UserWithMaps,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedMapResponse {
    pub message: String,
    pub map: Map,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapCountResponse {
    pub map_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedKeysResponse {
    pub message: String,
    pub updated_keys: Vec<String>,
}
