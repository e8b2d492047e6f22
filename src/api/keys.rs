//! Key-binding endpoint

use axum::{extract::State, response::Json};
use axum_extra::extract::WithRejection;

use super::dto::{UpdateKeysRequest, UpdatedKeysResponse};
use crate::AppState;
use crate::error::{AppError, ResultExt};

const UPDATE_KEYS_FAILED: &str = "[Error] An error occurred while updating the keys";

/// PUT /keys
///
/// Replaces the whole list. An unknown email is reported as a 500 like
/// any other storage failure.
pub async fn update_keys(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateKeysRequest>, AppError>,
) -> Result<Json<UpdatedKeysResponse>, AppError> {
    let updated_keys = state
        .db
        .update_user_keys(&request.email, &request.keys)
        .await
        .or_fail_with(UPDATE_KEYS_FAILED)?;

    Ok(Json(UpdatedKeysResponse {
        message: "Keys updated successfully".to_string(),
        updated_keys,
    }))
}
