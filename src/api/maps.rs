//! Map endpoints
//!
//! ```text
//! GET   /maps?email=
//! POST  /maps {"name","creatorEmail","config"}
//! POST  /maps/email {"email"}
//! GET   /maps/amount?email=
//! GET   /map?id=
//! PATCH /map/rating {"id","increment"}
//! ```

use axum::{
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
};
use axum_extra::extract::WithRejection;

use super::dto::{
    CreateMapRequest, CreatedMapResponse, EmailFilter, MapCountResponse, MapIdQuery,
    RatingUpdateRequest,
};
use crate::AppState;
use crate::data::{Map, NewMap};
use crate::error::{AppError, ResultExt};

const FETCH_MAPS_FAILED: &str = "Failed to fetch maps";
const FETCH_MAPS_BY_EMAIL_FAILED: &str = "[Error] An error occurred while looking for the maps";
const ADD_MAP_FAILED: &str = "[Error] An error occurred while adding the map";
const COUNT_MAPS_FAILED: &str = "[Error] An error occurred while getting the map amount";
const FIND_MAP_FAILED: &str = "[Error] An error occurred while looking for the map with id";
const UPDATE_RATING_FAILED: &str = "[Error] An error occurred while updating the map rating";
const ID_NOT_PROVIDED: &str = "[Error] id not provided";
const MAP_NOT_FOUND: &str = "[Error] Map not found";

/// GET /maps?email=
pub async fn list_maps(
    State(state): State<AppState>,
    Query(filter): Query<EmailFilter>,
) -> Result<Json<Vec<Map>>, AppError> {
    let maps = state
        .db
        .list_maps(filter.email())
        .await
        .or_fail_with(FETCH_MAPS_FAILED)?;

    Ok(Json(maps))
}

/// POST /maps/email
///
/// Same filter as `GET /maps`, with the email in the body. A request
/// without a JSON content type is read as an empty filter.
pub async fn list_maps_by_email(
    State(state): State<AppState>,
    body: Result<Json<EmailFilter>, JsonRejection>,
) -> Result<Json<Vec<Map>>, AppError> {
    let filter = match body {
        Ok(Json(filter)) => filter,
        Err(JsonRejection::MissingJsonContentType(_)) => EmailFilter::default(),
        Err(rejection) => return Err(rejection.into()),
    };

    let maps = state
        .db
        .list_maps(filter.email())
        .await
        .or_fail_with(FETCH_MAPS_BY_EMAIL_FAILED)?;

    Ok(Json(maps))
}

/// POST /maps
///
/// The creator must already exist; the database enforces it.
pub async fn create_map(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<CreateMapRequest>, AppError>,
) -> Result<(StatusCode, Json<CreatedMapResponse>), AppError> {
    let new_map = NewMap::from(request);
    let map = state
        .db
        .create_map(&new_map)
        .await
        .or_fail_with(ADD_MAP_FAILED)?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedMapResponse {
            message: format!("Map added successfully: {}", map.name),
            map,
        }),
    ))
}

/// GET /maps/amount?email=
pub async fn count_maps(
    State(state): State<AppState>,
    Query(filter): Query<EmailFilter>,
) -> Result<Json<MapCountResponse>, AppError> {
    let map_count = state
        .db
        .count_maps(filter.email())
        .await
        .or_fail_with(COUNT_MAPS_FAILED)?;

    Ok(Json(MapCountResponse { map_count }))
}

/// GET /map?id=
///
/// An unknown id answers 200 with `null`, not 404.
pub async fn get_map(
    State(state): State<AppState>,
    Query(query): Query<MapIdQuery>,
) -> Result<Json<Option<Map>>, AppError> {
    let raw_id = query
        .id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation(ID_NOT_PROVIDED.to_string()))?;

    let id = parse_leading_int(raw_id).ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!("map id {raw_id:?} is not a number"))
            .with_message(FIND_MAP_FAILED)
    })?;

    let map = state.db.get_map(id).await.or_fail_with(FIND_MAP_FAILED)?;

    Ok(Json(map))
}

/// PATCH /map/rating
///
/// Applied as a single atomic increment.
pub async fn update_rating(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<RatingUpdateRequest>, AppError>,
) -> Result<Json<Map>, AppError> {
    let map = state
        .db
        .increment_map_rating(request.id, request.increment)
        .await
        .or_fail_with(UPDATE_RATING_FAILED)?
        .ok_or_else(|| AppError::NotFound(MAP_NOT_FOUND.to_string()))?;

    Ok(Json(map))
}

/// Parse the integer prefix of `raw`.
///
/// Leading whitespace and one sign are allowed; anything after the digits
/// is ignored, so `"12abc"` is 12. Returns `None` when no digit follows.
fn parse_leading_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, unsigned) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits_len = unsigned
        .bytes()
        .take_while(|byte| byte.is_ascii_digit())
        .count();
    if digits_len == 0 {
        return None;
    }

    let magnitude: i64 = unsigned[..digits_len].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}
