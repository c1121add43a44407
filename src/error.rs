use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Business-rule failures surfaced by the auth engines.
///
/// Display gives the stable kind string that clients match on; the HTTP
/// status is a transport concern applied in `IntoResponse`.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("ACCOUNT_EXISTS")]
    AccountExists,
    #[error("USER_NOT_EXISTS")]
    UserNotExists,
    #[error("USER_NOT_VERIFIED")]
    UserNotVerified,
    #[error("INVALID_PASSWORD")]
    InvalidPassword,
    #[error("INVALID_OLD_PASSWORD")]
    InvalidOldPassword,
    #[error("INVALID_OTP")]
    InvalidOtp,
    #[error("OTP_EXPIRED")]
    OtpExpired,
    /// Reserved kind: re-submission of a consumed OTP. Never raised today,
    /// kept so the wire taxonomy stays complete.
    #[error("REUSE_OTP")]
    ReuseOtp,
    #[error("INVALID_EMAIL")]
    InvalidEmail,
    #[error("{0}")]
    Validation(String),
    #[error("INVALID_TOKEN")]
    InvalidToken,
    #[error("TOKEN_EXPIRED")]
    TokenExpired,
    #[error("SYSTEM_ERROR")]
    System(#[from] anyhow::Error),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::AccountExists
            | AuthError::UserNotVerified
            | AuthError::InvalidPassword
            | AuthError::InvalidOldPassword
            | AuthError::OtpExpired
            | AuthError::ReuseOtp => StatusCode::CONFLICT,
            AuthError::UserNotExists | AuthError::InvalidOtp => StatusCode::NOT_FOUND,
            AuthError::InvalidEmail | AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::InvalidToken | AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
            AuthError::System(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let AuthError::System(ref e) = self {
            error!(error = %e, "internal error");
        }
        let status = self.status();
        let body = Json(json!({
            "statusCode": status.as_u16(),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}
