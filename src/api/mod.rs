//! API layer
//!
//! HTTP handlers for:
//! - Users and key bindings
//! - Maps and ratings
//! - Metrics (Prometheus)

mod dto;
mod keys;
mod maps;
pub mod metrics;
mod users;

pub use dto::*;

pub use metrics::{metrics_router, track_http_metrics};

use axum::{
    Router,
    routing::{get, patch, post, put},
};

use crate::AppState;

/// Create the user/map/keys router
///
/// None of these routes require authentication.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/user", get(users::find_user))
        .route("/maps", get(maps::list_maps).post(maps::create_map))
        .route("/maps/email", post(maps::list_maps_by_email))
        .route("/maps/amount", get(maps::count_maps))
        .route("/map", get(maps::get_map))
        .route("/map/rating", patch(maps::update_rating))
        .route("/keys", put(keys::update_keys))
}
