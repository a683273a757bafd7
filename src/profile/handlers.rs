use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::{error, info, instrument};

use crate::auth::services::AuthUser;
use crate::state::AppState;

use super::budget::{macro_budget, MacroBudget};
use super::dto::{ProfileResponse, SaveProfileRequest};
use super::repo;

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", put(save_profile).get(get_profile))
        .route("/profile/budget", get(get_budget))
}

#[instrument(skip(state, payload))]
pub async fn save_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<SaveProfileRequest>,
) -> Result<Json<ProfileResponse>, (StatusCode, String)> {
    if let Err(msg) = payload.validate() {
        return Err((StatusCode::BAD_REQUEST, msg));
    }

    let profile = repo::upsert(
        &state.db,
        user_id,
        payload.age,
        payload.weight_lb,
        payload.height_ft,
        payload.sex,
        payload.activity_level,
        payload.goal,
    )
    .await
    .map_err(|e| {
        error!(error = %e, %user_id, "profile upsert failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    info!(%user_id, "profile saved");
    Ok(Json(profile.into()))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ProfileResponse>, (StatusCode, String)> {
    let profile = repo::find_by_user(&state.db, user_id)
        .await
        .map_err(|e| {
            error!(error = %e, %user_id, "profile lookup failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?
        .ok_or((StatusCode::NOT_FOUND, "No profile found".to_string()))?;

    Ok(Json(profile.into()))
}

#[instrument(skip(state))]
pub async fn get_budget(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<MacroBudget>, (StatusCode, String)> {
    let profile = repo::find_by_user(&state.db, user_id)
        .await
        .map_err(|e| {
            error!(error = %e, %user_id, "profile lookup failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?
        .ok_or((StatusCode::NOT_FOUND, "No profile found".to_string()))?;

    Ok(Json(macro_budget(&profile)))
}
