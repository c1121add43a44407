use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::types::Json;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::model::{NewUser, Otp, Provider, Role, User};
use crate::users::store::UserStore;

/// In-memory directory with the same semantics as `PgUsers`, used by
/// `AppState::fake()` and the engine tests.
#[derive(Default)]
pub struct InMemoryUsers {
    inner: Mutex<HashMap<Uuid, User>>,
}

impl InMemoryUsers {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut HashMap<Uuid, User>) -> T) -> T {
        let mut map = self.inner.lock().expect("users map poisoned");
        f(&mut map)
    }

    fn update(&self, id: Uuid, f: impl FnOnce(&mut User)) -> Option<User> {
        self.with(|map| {
            let user = map.get_mut(&id)?;
            f(user);
            Some(user.clone())
        })
    }
}

#[async_trait]
impl UserStore for InMemoryUsers {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self.with(|map| map.values().find(|u| u.email == email).cloned()))
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.with(|map| map.get(&id).cloned()))
    }

    async fn find_by_email_and_otp(
        &self,
        email: &str,
        otp: &str,
    ) -> anyhow::Result<Option<User>> {
        Ok(self.with(|map| {
            map.values()
                .find(|u| u.email == email && u.otp_code.as_deref() == Some(otp))
                .cloned()
        }))
    }

    async fn find_by_otp(&self, otp: &str) -> anyhow::Result<Option<User>> {
        Ok(self.with(|map| {
            map.values()
                .find(|u| u.otp_code.as_deref() == Some(otp))
                .cloned()
        }))
    }

    async fn create(&self, new: NewUser) -> anyhow::Result<User> {
        self.with(|map| {
            if map.values().any(|u| u.email == new.email) {
                anyhow::bail!("duplicate email: {}", new.email);
            }
            let (otp_code, otp_expires_at) = match new.otp {
                Some(otp) => (Some(otp.code), Some(otp.expires_at)),
                None => (None, None),
            };
            let user = User {
                id: Uuid::new_v4(),
                email: new.email,
                full_name: new.full_name,
                password_hash: new.password_hash,
                avatar_url: None,
                email_verified_at: None,
                otp_code,
                otp_expires_at,
                is_active: true,
                role: Role::User,
                providers: Json(new.providers),
                deleted_at: None,
                created_at: OffsetDateTime::now_utc(),
            };
            map.insert(user.id, user.clone());
            Ok(user)
        })
    }

    async fn set_otp(&self, id: Uuid, otp: &Otp) -> anyhow::Result<Option<User>> {
        Ok(self.update(id, |u| {
            u.otp_code = Some(otp.code.clone());
            u.otp_expires_at = Some(otp.expires_at);
        }))
    }

    async fn mark_verified(&self, id: Uuid, at: OffsetDateTime) -> anyhow::Result<Option<User>> {
        Ok(self.update(id, |u| u.email_verified_at = Some(at)))
    }

    async fn set_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<Option<User>> {
        Ok(self.update(id, |u| u.password_hash = Some(password_hash.to_string())))
    }

    async fn set_full_name(&self, id: Uuid, full_name: &str) -> anyhow::Result<Option<User>> {
        Ok(self.update(id, |u| u.full_name = full_name.to_string()))
    }

    async fn set_avatar(&self, id: Uuid, url: &str) -> anyhow::Result<Option<User>> {
        Ok(self.update(id, |u| u.avatar_url = Some(url.to_string())))
    }

    async fn link_provider(
        &self,
        id: Uuid,
        provider: &Provider,
        verified_at: OffsetDateTime,
    ) -> anyhow::Result<Option<User>> {
        Ok(self.with(|map| {
            let user = map.get_mut(&id)?;
            if user.has_provider(&provider.provider) {
                return None;
            }
            user.providers.0.push(provider.clone());
            user.email_verified_at = Some(verified_at);
            Some(user.clone())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            full_name: "Jane Doe".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_rejects_duplicate_email() {
        let store = InMemoryUsers::new();
        store.create(new_user("jane@x.com")).await.unwrap();
        assert!(store.create(new_user("jane@x.com")).await.is_err());
    }

    #[tokio::test]
    async fn link_provider_refuses_duplicate_name() {
        let store = InMemoryUsers::new();
        let user = store.create(new_user("jane@x.com")).await.unwrap();
        let google = Provider {
            provider_id: "g-1".into(),
            provider: "google".into(),
        };
        let now = OffsetDateTime::now_utc();

        let linked = store.link_provider(user.id, &google, now).await.unwrap();
        assert!(linked.is_some());
        assert!(linked.unwrap().is_verified());

        // second id under the same provider name must not append
        let again = Provider {
            provider_id: "g-2".into(),
            provider: "google".into(),
        };
        assert!(store.link_provider(user.id, &again, now).await.unwrap().is_none());

        let stored = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.providers.0.len(), 1);
    }

    #[tokio::test]
    async fn set_otp_overwrites_the_slot() {
        let store = InMemoryUsers::new();
        let user = store.create(new_user("jane@x.com")).await.unwrap();
        let now = OffsetDateTime::now_utc();
        store
            .set_otp(user.id, &Otp { code: "1111".into(), expires_at: now })
            .await
            .unwrap();
        store
            .set_otp(user.id, &Otp { code: "2222".into(), expires_at: now })
            .await
            .unwrap();
        let stored = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.otp_code.as_deref(), Some("2222"));
        assert!(store.find_by_otp("1111").await.unwrap().is_none());
    }
}
