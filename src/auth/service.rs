use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::info;

use crate::auth::dto::{AuthPayload, NextStep, ResetPasswordRequest};
use crate::auth::jwt::JwtKeys;
use crate::auth::{otp, password};
use crate::error::AuthError;
use crate::mail::{self, Email};
use crate::state::AppState;
use crate::templates::{self, subjects};
use crate::users::model::{NewUser, Otp, PublicUser, User};
use crate::users::store::UserStore;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Emails are unique case-insensitively; normalize before every lookup
/// and write.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Replace the user's OTP slot with a fresh code. Always an unconditional
/// overwrite: whatever code was outstanding stops being valid.
pub(crate) async fn issue_otp(state: &AppState, user: &User) -> Result<Otp, AuthError> {
    let otp = otp::issue(state.config.otp_ttl_minutes);
    state.users.set_otp(user.id, &otp).await?;
    Ok(otp)
}

fn session(state: &AppState, user: &User) -> Result<AuthPayload, AuthError> {
    let keys = JwtKeys::from_ref(state);
    let token = keys.issue_pair(user)?;
    Ok(AuthPayload::session(user.public(), token))
}

/// Decide what a client holding only an email should do next. Absence is a
/// normal branch here, not an error: the flow doubles as a pre-registration
/// check.
pub async fn identify(state: &AppState, email: &str) -> Result<AuthPayload, AuthError> {
    let email = normalize_email(email);
    let Some(user) = state.users.find_by_email(&email).await? else {
        return Ok(AuthPayload::step(NextStep::Register));
    };

    if !user.is_verified() {
        let otp = issue_otp(state, &user).await?;
        mail::dispatch(
            &state.mailer,
            Email {
                to: email,
                subject: subjects::REGISTER.into(),
                html: templates::registration(&user.full_name, &otp.code),
            },
        );
        return Ok(AuthPayload::step(NextStep::VerifyEmail));
    }

    Ok(AuthPayload::step(NextStep::SetPassword))
}

/// Create a local account and send the verification OTP. The caller gets
/// the public snapshot only; the stored hash never leaves the engine.
pub async fn register(
    state: &AppState,
    full_name: &str,
    email: &str,
    plain_password: &str,
) -> Result<PublicUser, AuthError> {
    let email = normalize_email(email);
    if state.users.find_by_email(&email).await?.is_some() {
        return Err(AuthError::AccountExists);
    }

    let password_hash = password::hash_password(plain_password)?;
    let otp = otp::issue(state.config.otp_ttl_minutes);

    mail::dispatch(
        &state.mailer,
        Email {
            to: email.clone(),
            subject: subjects::REGISTER.into(),
            html: templates::registration(full_name, &otp.code),
        },
    );

    let user = state
        .users
        .create(NewUser {
            email,
            full_name: full_name.to_string(),
            password_hash: Some(password_hash),
            otp: Some(otp),
            providers: vec![],
        })
        .await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user.public())
}

/// Password login. Never proceeds for an unverified account: a fresh OTP
/// goes out and the caller gets USER_NOT_VERIFIED.
pub async fn login(
    state: &AppState,
    email: &str,
    plain_password: &str,
) -> Result<AuthPayload, AuthError> {
    let email = normalize_email(email);
    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or(AuthError::UserNotExists)?;

    if !user.is_verified() {
        let otp = issue_otp(state, &user).await?;
        mail::dispatch(
            &state.mailer,
            Email {
                to: email,
                subject: subjects::REGISTER.into(),
                html: templates::registration(&user.full_name, &otp.code),
            },
        );
        return Err(AuthError::UserNotVerified);
    }

    let matches = match user.password_hash.as_deref() {
        Some(hash) => password::verify_password(plain_password, hash)?,
        None => false, // social-only account with no password set
    };
    if !matches {
        return Err(AuthError::InvalidPassword);
    }

    info!(user_id = %user.id, email = %user.email, "user logged in");
    session(state, &user)
}

/// Consume the OTP sent at registration. Verification is idempotent; the
/// timestamp is overwritten unconditionally. An account that never got a
/// password is told to set one up instead of receiving tokens.
pub async fn verify_email(
    state: &AppState,
    email: &str,
    otp_code: &str,
    wants_welcome_email: bool,
) -> Result<AuthPayload, AuthError> {
    let email = normalize_email(email);
    let user = state
        .users
        .find_by_email_and_otp(&email, otp_code)
        .await?
        .ok_or(AuthError::InvalidOtp)?;

    let now = OffsetDateTime::now_utc();
    if user.otp_expired(now) {
        return Err(AuthError::OtpExpired);
    }

    let user = state
        .users
        .mark_verified(user.id, now)
        .await?
        .unwrap_or(user);

    if wants_welcome_email {
        mail::dispatch(
            &state.mailer,
            Email {
                to: user.email.clone(),
                subject: subjects::WELCOME.into(),
                html: templates::welcome(&user.full_name),
            },
        );
    }

    if user.password_hash.is_none() {
        return Ok(AuthPayload::step(NextStep::SetupPassword));
    }

    info!(user_id = %user.id, "email verified");
    session(state, &user)
}

/// Start a password reset for a verified account.
pub async fn forgot_password(state: &AppState, email: &str) -> Result<(), AuthError> {
    let email = normalize_email(email);
    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or(AuthError::UserNotExists)?;

    if !user.is_verified() {
        return Err(AuthError::UserNotVerified);
    }

    let otp = issue_otp(state, &user).await?;
    mail::dispatch(
        &state.mailer,
        Email {
            to: email,
            subject: subjects::FORGOT_PASSWORD.into(),
            html: templates::forgot_password(&user.full_name, &otp.code),
        },
    );
    Ok(())
}

/// Re-send a code. Deliberately no verified-state check: resending must
/// work before the first verification too.
pub async fn resend_otp(state: &AppState, email: &str) -> Result<(), AuthError> {
    let email = normalize_email(email);
    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or(AuthError::UserNotExists)?;

    let otp = issue_otp(state, &user).await?;
    mail::dispatch(
        &state.mailer,
        Email {
            to: email,
            subject: subjects::RESEND_OTP.into(),
            html: templates::resend_otp(&user.full_name, &otp.code),
        },
    );
    Ok(())
}

/// Set a new password after OTP confirmation. Lookup prefers the OTP when
/// supplied, else falls back to the email. The OTP slot is left in place
/// and lapses at its natural expiry.
pub async fn reset_password(
    state: &AppState,
    request: ResetPasswordRequest,
) -> Result<(), AuthError> {
    let user = match (&request.otp, &request.email) {
        (Some(otp_code), _) => state.users.find_by_otp(otp_code).await?,
        (None, Some(email)) => state.users.find_by_email(&normalize_email(email)).await?,
        (None, None) => None,
    };
    let user = user.ok_or(AuthError::InvalidOtp)?;

    if user.otp_expired(OffsetDateTime::now_utc()) {
        return Err(AuthError::OtpExpired);
    }

    let password_hash = password::hash_password(&request.password)?;
    state.users.set_password(user.id, &password_hash).await?;

    mail::dispatch(
        &state.mailer,
        Email {
            to: user.email.clone(),
            subject: subjects::PASSWORD_RESET_CONFIRMATION.into(),
            html: templates::password_reset_confirmation(&user.full_name),
        },
    );
    info!(user_id = %user.id, "password reset");
    Ok(())
}

/// Exchange a refresh token for a fresh pair.
pub async fn refresh(state: &AppState, refresh_token: &str) -> Result<AuthPayload, AuthError> {
    let keys = JwtKeys::from_ref(state);
    let claims = keys.verify_refresh(refresh_token)?;
    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or(AuthError::InvalidToken)?;
    session(state, &user)
}
