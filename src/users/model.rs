use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

/// External identity linked to an account, e.g. a Google login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub provider_id: String,
    pub provider: String,
}

/// Passive role attribute carried into tokens; not enforced here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// The single outstanding one-time password slot of a user. Replaced
/// wholesale on every issuance; the previous code stops being valid the
/// moment a new one lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Otp {
    pub code: String,
    pub expires_at: OffsetDateTime,
}

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub password_hash: Option<String>, // absent for social-only accounts
    pub avatar_url: Option<String>,
    pub email_verified_at: Option<OffsetDateTime>,
    pub otp_code: Option<String>,
    pub otp_expires_at: Option<OffsetDateTime>,
    pub is_active: bool,
    pub role: Role,
    pub providers: Json<Vec<Provider>>,
    pub deleted_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

impl User {
    /// A user is verified iff the timestamp is present.
    pub fn is_verified(&self) -> bool {
        self.email_verified_at.is_some()
    }

    pub fn has_provider(&self, provider: &str) -> bool {
        self.providers.0.iter().any(|p| p.provider == provider)
    }

    /// Exact `{providerId, provider}` match. Name-only presence is not
    /// enough to treat a social login as a repeat visit.
    pub fn has_provider_identity(&self, provider_id: &str, provider: &str) -> bool {
        self.providers
            .0
            .iter()
            .any(|p| p.provider_id == provider_id && p.provider == provider)
    }

    /// Whether the outstanding OTP is past its expiry at `now`.
    pub fn otp_expired(&self, now: OffsetDateTime) -> bool {
        match self.otp_expires_at {
            Some(expires_at) => now > expires_at,
            None => true,
        }
    }

    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            avatar: self.avatar_url.clone(),
            role: self.role,
            is_active: self.is_active,
        }
    }
}

/// Public part of the user returned to clients; never carries the hash
/// or the OTP slot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub avatar: Option<String>,
    pub role: Role,
    pub is_active: bool,
}

/// Fields accepted by the directory when creating a user. Registration
/// supplies a hash and an OTP; social signup supplies providers instead.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub email: String,
    pub full_name: String,
    pub password_hash: Option<String>,
    pub otp: Option<Otp>,
    pub providers: Vec<Provider>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn sample_user() -> User {
        let now = OffsetDateTime::now_utc();
        User {
            id: Uuid::new_v4(),
            email: "jane@x.com".into(),
            full_name: "Jane Doe".into(),
            password_hash: None,
            avatar_url: None,
            email_verified_at: None,
            otp_code: Some("1234".into()),
            otp_expires_at: Some(now + Duration::minutes(10)),
            is_active: true,
            role: Role::User,
            providers: Json(vec![Provider {
                provider_id: "g-123".into(),
                provider: "google".into(),
            }]),
            deleted_at: None,
            created_at: now,
        }
    }

    #[test]
    fn verified_flag_is_timestamp_presence() {
        let mut user = sample_user();
        assert!(!user.is_verified());
        user.email_verified_at = Some(OffsetDateTime::now_utc());
        assert!(user.is_verified());
    }

    #[test]
    fn otp_expiry_is_wall_clock_comparison() {
        let user = sample_user();
        let now = OffsetDateTime::now_utc();
        assert!(!user.otp_expired(now));
        assert!(user.otp_expired(now + Duration::minutes(11)));
    }

    #[test]
    fn missing_otp_counts_as_expired() {
        let mut user = sample_user();
        user.otp_code = None;
        user.otp_expires_at = None;
        assert!(user.otp_expired(OffsetDateTime::now_utc()));
    }

    #[test]
    fn provider_lookup_is_by_name() {
        let user = sample_user();
        assert!(user.has_provider("google"));
        assert!(!user.has_provider("github"));
    }

    #[test]
    fn provider_identity_needs_both_fields() {
        let user = sample_user();
        assert!(user.has_provider_identity("g-123", "google"));
        assert!(!user.has_provider_identity("g-456", "google"));
        assert!(!user.has_provider_identity("g-123", "github"));
    }

    #[test]
    fn public_snapshot_has_no_secrets() {
        let user = sample_user();
        let json = serde_json::to_string(&user.public()).unwrap();
        assert!(json.contains("jane@x.com"));
        assert!(!json.contains("otp"));
        assert!(!json.contains("password"));
    }
}
