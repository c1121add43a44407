use axum::{
    extract::State,
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;

use crate::auth::jwt::AuthUser;
use crate::error::AuthError;
use crate::state::AppState;
use crate::users::dto::{AvatarUploadRequest, UpdatePasswordRequest, UpdateProfileRequest};
use crate::users::model::PublicUser;
use crate::users::service;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user", get(get_me))
        .route("/user/profile", put(update_profile))
        .route("/user/password", put(update_password))
        .route("/user/avatar", put(update_avatar))
}

#[instrument(skip(state))]
async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, AuthError> {
    Ok(Json(service::get_profile(&state, user_id).await?))
}

#[instrument(skip(state, payload))]
async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<PublicUser>, AuthError> {
    let name = payload.full_name.trim();
    if !(3..=50).contains(&name.chars().count()) {
        return Err(AuthError::Validation(
            "fullName must be between 3 and 50 characters".into(),
        ));
    }
    Ok(Json(service::update_profile(&state, user_id, name).await?))
}

#[instrument(skip(state, payload))]
async fn update_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<axum::http::StatusCode, AuthError> {
    if payload.password.len() < 8 {
        return Err(AuthError::Validation("Password too short".into()));
    }
    service::update_password(&state, user_id, &payload.old_password, &payload.password).await?;
    Ok(axum::http::StatusCode::OK)
}

#[instrument(skip(state, payload))]
async fn update_avatar(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<AvatarUploadRequest>,
) -> Result<Json<PublicUser>, AuthError> {
    Ok(Json(service::update_avatar(&state, user_id, payload).await?))
}
