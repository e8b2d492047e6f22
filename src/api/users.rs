//! User endpoints
//!
//! ```text
//! GET  /users
//! POST /users {"email","name","password"}
//! GET  /user?email=
//! ```

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use axum_extra::extract::WithRejection;

use super::dto::{CreateUserRequest, CreatedUserResponse, EmailFilter};
use crate::AppState;
use crate::data::{NewUser, User, UserWithMaps};
use crate::error::{AppError, ResultExt};

const LIST_USERS_FAILED: &str = "[Error] An error occurred while looking for the users";
const ADD_USER_FAILED: &str = "[Error] An error occurred while adding the user";
const FIND_USER_FAILED: &str = "[Error] An error occurred while looking for the user with email";
const EMAIL_NOT_PROVIDED: &str = "[Error] email not provided";

/// GET /users
///
/// Every user with their maps. Not paginated.
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserWithMaps>>, AppError> {
    let users = state
        .db
        .list_users_with_maps()
        .await
        .or_fail_with(LIST_USERS_FAILED)?;

    Ok(Json(users))
}

/// POST /users
pub async fn create_user(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<CreateUserRequest>, AppError>,
) -> Result<(StatusCode, Json<CreatedUserResponse>), AppError> {
    let new_user = NewUser::from(request);
    let user = state
        .db
        .create_user(&new_user)
        .await
        .or_fail_with(ADD_USER_FAILED)?;

    tracing::info!(user_id = user.id, "User created");

    Ok((
        StatusCode::CREATED,
        Json(CreatedUserResponse {
            new_user: UserWithMaps {
                user,
                maps: Vec::new(),
            },
        }),
    ))
}

/// GET /user?email=
///
/// An unknown email answers 200 with `null`, not 404.
pub async fn find_user(
    State(state): State<AppState>,
    Query(filter): Query<EmailFilter>,
) -> Result<Json<Option<User>>, AppError> {
    let email = filter
        .email()
        .ok_or_else(|| AppError::Validation(EMAIL_NOT_PROVIDED.to_string()))?;

    let user = state
        .db
        .find_user_by_email(email)
        .await
        .or_fail_with(FIND_USER_FAILED)?;

    Ok(Json(user))
}
