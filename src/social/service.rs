use axum::extract::FromRef;
use time::OffsetDateTime;
use tracing::info;

use crate::auth::dto::{AuthPayload, NextStep};
use crate::auth::jwt::JwtKeys;
use crate::auth::service::{issue_otp, normalize_email};
use crate::error::AuthError;
use crate::mail::{self, Email};
use crate::social::dto::{LinkAccountRequest, SocialLoginRequest};
use crate::state::AppState;
use crate::templates::{self, subjects};
use crate::users::model::{NewUser, Provider, User};
use crate::users::store::UserStore;

fn session(state: &AppState, user: &User) -> Result<AuthPayload, AuthError> {
    let keys = JwtKeys::from_ref(state);
    let token = keys.issue_pair(user)?;
    Ok(AuthPayload::session(user.public(), token))
}

/// Social provider login. A brand-new email signs up on the spot with the
/// provider attached and no password; verification is skipped since the
/// provider already vouched for the address. An existing account that has
/// not seen this exact `{providerId, provider}` identity must first prove
/// ownership of the local email via OTP, so authentication is deferred
/// behind ACCOUNT_LINKING.
pub async fn social_login(
    state: &AppState,
    request: SocialLoginRequest,
) -> Result<AuthPayload, AuthError> {
    let email = normalize_email(&request.email);
    let Some(user) = state.users.find_by_email(&email).await? else {
        let user = state
            .users
            .create(NewUser {
                email,
                full_name: request.full_name.clone(),
                password_hash: None,
                otp: None,
                providers: vec![Provider {
                    provider_id: request.provider_id,
                    provider: request.provider,
                }],
            })
            .await?;
        info!(user_id = %user.id, "social signup");
        return session(state, &user);
    };

    if user.has_provider_identity(&request.provider_id, &request.provider) {
        // repeat social login on an already-linked identity
        return session(state, &user);
    }

    let otp = issue_otp(state, &user).await?;
    mail::dispatch(
        &state.mailer,
        Email {
            to: email,
            subject: subjects::ACCOUNT_LINKING.into(),
            html: templates::account_linking(&user.full_name, &otp.code),
        },
    );
    Ok(AuthPayload::step(NextStep::AccountLinking))
}

/// Attach a provider to an existing account once the OTP proves the caller
/// owns the local email. OTP discipline matches email verification.
pub async fn link_account(
    state: &AppState,
    request: LinkAccountRequest,
) -> Result<AuthPayload, AuthError> {
    let email = normalize_email(&request.email);
    let user = state
        .users
        .find_by_email_and_otp(&email, &request.otp)
        .await?
        .ok_or(AuthError::InvalidOtp)?;

    let now = OffsetDateTime::now_utc();
    if user.otp_expired(now) {
        return Err(AuthError::OtpExpired);
    }

    let provider = Provider {
        provider_id: request.provider_id,
        provider: request.provider,
    };
    // guarded append; `None` means the provider name was already linked,
    // which is a no-op rather than an error
    let user = match state.users.link_provider(user.id, &provider, now).await? {
        Some(updated) => updated,
        None => state
            .users
            .mark_verified(user.id, now)
            .await?
            .unwrap_or(user),
    };

    info!(user_id = %user.id, provider = %provider.provider, "account linked");
    session(state, &user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::store::UserStore;
    use std::sync::Arc;

    async fn settle() {
        tokio::time::sleep(std::time::Duration::from_millis(25)).await;
    }

    fn google_profile(email: &str) -> SocialLoginRequest {
        SocialLoginRequest {
            email: email.into(),
            full_name: "Jane Doe".into(),
            provider_id: "g-123".into(),
            provider: "google".into(),
        }
    }

    async fn stored(state: &AppState, email: &str) -> User {
        state
            .users
            .find_by_email(email)
            .await
            .unwrap()
            .expect("user should exist")
    }

    #[tokio::test]
    async fn new_email_signs_up_and_gets_tokens_immediately() {
        let (state, mailbox) = AppState::fake_with_mailbox();
        let payload = social_login(&state, google_profile("jane@x.com"))
            .await
            .unwrap();
        assert!(matches!(payload, AuthPayload::Session { .. }));

        let user = stored(&state, "jane@x.com").await;
        assert!(user.password_hash.is_none());
        assert!(user.has_provider("google"));
        assert!(user.otp_code.is_none());

        settle().await;
        assert!(mailbox.subjects().is_empty());
    }

    #[tokio::test]
    async fn repeat_social_login_returns_tokens_without_linking() {
        let state = AppState::fake();
        social_login(&state, google_profile("jane@x.com")).await.unwrap();
        let payload = social_login(&state, google_profile("jane@x.com"))
            .await
            .unwrap();
        assert!(matches!(payload, AuthPayload::Session { .. }));
        assert_eq!(stored(&state, "jane@x.com").await.providers.0.len(), 1);
    }

    #[tokio::test]
    async fn same_provider_name_with_different_id_requires_linking() {
        let (state, mailbox) = AppState::fake_with_mailbox();
        social_login(&state, google_profile("jane@x.com")).await.unwrap();

        // a second google identity shows up for the same email
        let mut other = google_profile("jane@x.com");
        other.provider_id = "g-456".into();
        let payload = social_login(&state, other).await.unwrap();
        assert!(matches!(
            payload,
            AuthPayload::Step { next_step: NextStep::AccountLinking }
        ));

        settle().await;
        assert!(mailbox
            .subjects()
            .iter()
            .any(|s| s == subjects::ACCOUNT_LINKING));
        // the stored identity is untouched until the OTP confirms the link
        let user = stored(&state, "jane@x.com").await;
        assert_eq!(user.providers.0.len(), 1);
        assert_eq!(user.providers.0[0].provider_id, "g-123");
    }

    #[tokio::test]
    async fn existing_local_account_gets_linking_step_and_no_token() {
        let (state, mailbox) = AppState::fake_with_mailbox();
        crate::auth::service::register(&state, "Jane Doe", "jane@x.com", "Abc12345!")
            .await
            .unwrap();

        let payload = social_login(&state, google_profile("jane@x.com"))
            .await
            .unwrap();
        assert!(matches!(
            payload,
            AuthPayload::Step { next_step: NextStep::AccountLinking }
        ));

        settle().await;
        assert!(mailbox
            .subjects()
            .iter()
            .any(|s| s == subjects::ACCOUNT_LINKING));
        assert!(stored(&state, "jane@x.com").await.otp_code.is_some());
    }

    #[tokio::test]
    async fn link_account_appends_provider_and_verifies_email() {
        let state = AppState::fake();
        crate::auth::service::register(&state, "Jane Doe", "jane@x.com", "Abc12345!")
            .await
            .unwrap();
        social_login(&state, google_profile("jane@x.com")).await.unwrap();
        let code = stored(&state, "jane@x.com").await.otp_code.unwrap();

        let payload = link_account(
            &state,
            LinkAccountRequest {
                email: "jane@x.com".into(),
                otp: code,
                provider_id: "g-123".into(),
                provider: "google".into(),
            },
        )
        .await
        .unwrap();
        assert!(matches!(payload, AuthPayload::Session { .. }));

        let user = stored(&state, "jane@x.com").await;
        assert!(user.is_verified());
        assert!(user.has_provider("google"));
        assert_eq!(user.providers.0.len(), 1);
    }

    #[tokio::test]
    async fn link_account_rejects_bad_or_expired_otp() {
        let state = AppState::fake();
        crate::auth::service::register(&state, "Jane Doe", "jane@x.com", "Abc12345!")
            .await
            .unwrap();
        social_login(&state, google_profile("jane@x.com")).await.unwrap();

        let err = link_account(
            &state,
            LinkAccountRequest {
                email: "jane@x.com".into(),
                otp: "0000".into(),
                provider_id: "g-123".into(),
                provider: "google".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuthError::InvalidOtp));

        let user = stored(&state, "jane@x.com").await;
        state
            .users
            .set_otp(
                user.id,
                &crate::users::model::Otp {
                    code: "4321".into(),
                    expires_at: OffsetDateTime::now_utc() - time::Duration::minutes(1),
                },
            )
            .await
            .unwrap();
        let err = link_account(
            &state,
            LinkAccountRequest {
                email: "jane@x.com".into(),
                otp: "4321".into(),
                provider_id: "g-123".into(),
                provider: "google".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuthError::OtpExpired));
        assert!(!stored(&state, "jane@x.com").await.has_provider("google"));
    }

    #[tokio::test]
    async fn linking_an_already_linked_provider_is_a_noop_session() {
        let state = AppState::fake();
        social_login(&state, google_profile("jane@x.com")).await.unwrap();
        let user = stored(&state, "jane@x.com").await;

        // second id under the same provider name arrives with a valid OTP
        state
            .users
            .set_otp(
                user.id,
                &crate::users::model::Otp {
                    code: "9999".into(),
                    expires_at: OffsetDateTime::now_utc() + time::Duration::minutes(10),
                },
            )
            .await
            .unwrap();
        let payload = link_account(
            &state,
            LinkAccountRequest {
                email: "jane@x.com".into(),
                otp: "9999".into(),
                provider_id: "g-other".into(),
                provider: "google".into(),
            },
        )
        .await
        .unwrap();
        assert!(matches!(payload, AuthPayload::Session { .. }));
        assert_eq!(stored(&state, "jane@x.com").await.providers.0.len(), 1);
    }

    #[tokio::test]
    async fn social_login_failure_path_keeps_mailer_quiet_on_signup() {
        struct FailingMailer;
        #[async_trait::async_trait]
        impl crate::mail::Mailer for FailingMailer {
            async fn send(&self, _email: Email) -> anyhow::Result<()> {
                anyhow::bail!("mail api down")
            }
        }
        let (mut state, _) = AppState::fake_with_mailbox();
        state.mailer = Arc::new(FailingMailer);
        crate::auth::service::register(&state, "Jane Doe", "jane@x.com", "Abc12345!")
            .await
            .unwrap();

        // linking mail fails to deliver, yet the step is still returned
        let payload = social_login(&state, google_profile("jane@x.com"))
            .await
            .unwrap();
        assert!(matches!(
            payload,
            AuthPayload::Step { next_step: NextStep::AccountLinking }
        ));
    }
}
