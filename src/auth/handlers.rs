use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{instrument, warn};

use crate::auth::dto::{
    AuthPayload, ForgotPasswordRequest, IdentifyRequest, LoginRequest, RefreshRequest,
    RegisterRequest, ResendOtpRequest, ResetPasswordRequest, VerifyEmailRequest,
};
use crate::auth::service;
use crate::error::AuthError;
use crate::state::AppState;
use crate::users::model::PublicUser;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/identify", post(identify))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/verify-email", post(verify_email))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/resend-otp", post(resend_otp))
        .route("/auth/reset-password", post(reset_password))
        .route("/auth/refresh", post(refresh))
}

fn require_valid_email(email: &str) -> Result<(), AuthError> {
    if !service::is_valid_email(email.trim()) {
        warn!(email = %email, "invalid email");
        return Err(AuthError::InvalidEmail);
    }
    Ok(())
}

fn require_password(password: &str) -> Result<(), AuthError> {
    if password.len() < 8 {
        return Err(AuthError::Validation("Password too short".into()));
    }
    Ok(())
}

#[instrument(skip(state, payload))]
async fn identify(
    State(state): State<AppState>,
    Json(payload): Json<IdentifyRequest>,
) -> Result<Json<AuthPayload>, AuthError> {
    require_valid_email(&payload.email)?;
    Ok(Json(service::identify(&state, &payload.email).await?))
}

#[instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), AuthError> {
    require_valid_email(&payload.email)?;
    require_password(&payload.password)?;
    let name_len = payload.full_name.trim().chars().count();
    if !(3..=50).contains(&name_len) {
        return Err(AuthError::Validation(
            "fullName must be between 3 and 50 characters".into(),
        ));
    }

    let user = service::register(
        &state,
        payload.full_name.trim(),
        &payload.email,
        &payload.password,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthPayload>, AuthError> {
    require_valid_email(&payload.email)?;
    Ok(Json(
        service::login(&state, &payload.email, &payload.password).await?,
    ))
}

#[instrument(skip(state, payload))]
async fn verify_email(
    State(state): State<AppState>,
    Json(payload): Json<VerifyEmailRequest>,
) -> Result<Json<AuthPayload>, AuthError> {
    require_valid_email(&payload.email)?;
    Ok(Json(
        service::verify_email(
            &state,
            &payload.email,
            &payload.otp,
            payload.wants_welcome_email,
        )
        .await?,
    ))
}

#[instrument(skip(state, payload))]
async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<StatusCode, AuthError> {
    require_valid_email(&payload.email)?;
    service::forgot_password(&state, &payload.email).await?;
    Ok(StatusCode::OK)
}

#[instrument(skip(state, payload))]
async fn resend_otp(
    State(state): State<AppState>,
    Json(payload): Json<ResendOtpRequest>,
) -> Result<StatusCode, AuthError> {
    require_valid_email(&payload.email)?;
    service::resend_otp(&state, &payload.email).await?;
    Ok(StatusCode::OK)
}

#[instrument(skip(state, payload))]
async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<StatusCode, AuthError> {
    require_password(&payload.password)?;
    service::reset_password(&state, payload).await?;
    Ok(StatusCode::OK)
}

#[instrument(skip(state, payload))]
async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthPayload>, AuthError> {
    Ok(Json(service::refresh(&state, &payload.refresh_token).await?))
}
