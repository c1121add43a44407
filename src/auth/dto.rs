use serde::{Deserialize, Serialize};

use crate::auth::jwt::TokenPair;
use crate::users::model::PublicUser;

/// Signal telling the client which follow-up action the user must complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NextStep {
    Register,
    VerifyEmail,
    SetPassword,
    SetupPassword,
    AccountLinking,
}

/// Outcome of an auth flow: either a next step for the client, or an
/// authenticated session with a user snapshot and token pair.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AuthPayload {
    Step {
        #[serde(rename = "nextStep")]
        next_step: NextStep,
    },
    Session {
        user: PublicUser,
        token: TokenPair,
    },
}

impl AuthPayload {
    pub fn step(next_step: NextStep) -> Self {
        AuthPayload::Step { next_step }
    }

    pub fn session(user: PublicUser, token: TokenPair) -> Self {
        AuthPayload::Session { user, token }
    }
}

#[derive(Debug, Deserialize)]
pub struct IdentifyRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEmailRequest {
    pub email: String,
    pub otp: String,
    /// When set, a welcome email goes out after successful verification.
    #[serde(default)]
    pub wants_welcome_email: bool,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResendOtpRequest {
    pub email: String,
}

/// Reset by OTP when present, otherwise by email.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: Option<String>,
    pub otp: Option<String>,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_step_uses_wire_names() {
        let json = serde_json::to_string(&AuthPayload::step(NextStep::AccountLinking)).unwrap();
        assert_eq!(json, r#"{"nextStep":"ACCOUNT_LINKING"}"#);
        let json = serde_json::to_string(&NextStep::SetupPassword).unwrap();
        assert_eq!(json, r#""SETUP_PASSWORD""#);
    }

    #[test]
    fn verify_request_welcome_flag_defaults_off() {
        let req: VerifyEmailRequest =
            serde_json::from_str(r#"{"email":"jane@x.com","otp":"1234"}"#).unwrap();
        assert!(!req.wants_welcome_email);
    }
}
