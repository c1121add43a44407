use async_trait::async_trait;
use serde_json::json;
use sqlx::{types::Json, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::model::{NewUser, Otp, Provider, User};

/// Persistence contract for user records. Engines only ever do one read
/// followed by at most one conditional write per request, so every update
/// here is a single statement returning the new row (or `None` when the
/// condition did not match).
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_by_email_and_otp(&self, email: &str, otp: &str)
        -> anyhow::Result<Option<User>>;
    /// OTP-only lookup used by the password reset path.
    async fn find_by_otp(&self, otp: &str) -> anyhow::Result<Option<User>>;
    async fn create(&self, new: NewUser) -> anyhow::Result<User>;
    /// Overwrite the OTP slot; last write wins by design.
    async fn set_otp(&self, id: Uuid, otp: &Otp) -> anyhow::Result<Option<User>>;
    async fn mark_verified(&self, id: Uuid, at: OffsetDateTime) -> anyhow::Result<Option<User>>;
    async fn set_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<Option<User>>;
    async fn set_full_name(&self, id: Uuid, full_name: &str) -> anyhow::Result<Option<User>>;
    async fn set_avatar(&self, id: Uuid, url: &str) -> anyhow::Result<Option<User>>;
    /// Append a provider unless one with the same name is already linked,
    /// and mark the email verified in the same statement. Returns `None`
    /// when the provider was already present.
    async fn link_provider(
        &self,
        id: Uuid,
        provider: &Provider,
        verified_at: OffsetDateTime,
    ) -> anyhow::Result<Option<User>>;
}

const USER_COLUMNS: &str = "id, email, full_name, password_hash, avatar_url, \
     email_verified_at, otp_code, otp_expires_at, is_active, role, providers, \
     deleted_at, created_at";

/// Postgres-backed directory.
#[derive(Clone)]
pub struct PgUsers {
    db: PgPool,
}

impl PgUsers {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUsers {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_email_and_otp(
        &self,
        email: &str,
        otp: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND otp_code = $2"
        ))
        .bind(email)
        .bind(otp)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_otp(&self, otp: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE otp_code = $1"
        ))
        .bind(otp)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, new: NewUser) -> anyhow::Result<User> {
        let (otp_code, otp_expires_at) = match new.otp {
            Some(otp) => (Some(otp.code), Some(otp.expires_at)),
            None => (None, None),
        };
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, full_name, password_hash, otp_code, otp_expires_at, providers) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&new.email)
        .bind(&new.full_name)
        .bind(&new.password_hash)
        .bind(&otp_code)
        .bind(otp_expires_at)
        .bind(Json(&new.providers))
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn set_otp(&self, id: Uuid, otp: &Otp) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET otp_code = $2, otp_expires_at = $3 WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(&otp.code)
        .bind(otp.expires_at)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn mark_verified(&self, id: Uuid, at: OffsetDateTime) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET email_verified_at = $2 WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(at)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn set_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET password_hash = $2 WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(password_hash)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn set_full_name(&self, id: Uuid, full_name: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET full_name = $2 WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(full_name)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn set_avatar(&self, id: Uuid, url: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET avatar_url = $2 WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(url)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn link_provider(
        &self,
        id: Uuid,
        provider: &Provider,
        verified_at: OffsetDateTime,
    ) -> anyhow::Result<Option<User>> {
        // Guarded append: the jsonb containment check on the provider name
        // and the push happen in one statement, so two racing link attempts
        // cannot both insert.
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users \
             SET providers = providers || $2::jsonb, email_verified_at = $3 \
             WHERE id = $1 AND NOT providers @> $4::jsonb \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(Json(json!([provider])))
        .bind(verified_at)
        .bind(Json(json!([{ "provider": provider.provider }])))
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }
}
