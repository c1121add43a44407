use axum::{extract::State, routing::post, Json, Router};
use tracing::instrument;

use crate::auth::dto::AuthPayload;
use crate::error::AuthError;
use crate::social::dto::{LinkAccountRequest, SocialLoginRequest};
use crate::social::service;
use crate::state::AppState;

pub fn social_routes() -> Router<AppState> {
    Router::new()
        .route("/social-auth/login", post(social_login))
        .route("/social-auth/link-accounts", post(link_account))
}

#[instrument(skip(state, payload))]
async fn social_login(
    State(state): State<AppState>,
    Json(payload): Json<SocialLoginRequest>,
) -> Result<Json<AuthPayload>, AuthError> {
    Ok(Json(service::social_login(&state, payload).await?))
}

#[instrument(skip(state, payload))]
async fn link_account(
    State(state): State<AppState>,
    Json(payload): Json<LinkAccountRequest>,
) -> Result<Json<AuthPayload>, AuthError> {
    Ok(Json(service::link_account(&state, payload).await?))
}
