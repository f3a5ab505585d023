//! In-process [`UserRepo`] used by tests and local runs without Postgres.

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::auth::{
    repo::{StoreError, UserRepo},
    repo_types::{NewUser, User},
};

#[derive(Default)]
pub struct MemoryUsers {
    users: Mutex<HashMap<Uuid, User>>,
}

impl MemoryUsers {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepo for MemoryUsers {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.users.lock().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.lock().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn insert(&self, new: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.lock().await;
        if users.values().any(|u| u.email == new.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            subscription: new.subscription,
            avatar_url: Some(new.avatar_url),
            token: None,
            verify: false,
            verification_token: Some(new.verification_token),
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn verify_by_token(&self, token: &str) -> anyhow::Result<Option<User>> {
        let mut users = self.users.lock().await;
        let Some(user) = users
            .values_mut()
            .find(|u| u.verification_token.as_deref() == Some(token))
        else {
            return Ok(None);
        };
        user.verify = true;
        user.verification_token = None;
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }

    async fn set_session_token(&self, id: Uuid, token: Option<&str>) -> anyhow::Result<()> {
        if let Some(user) = self.users.lock().await.get_mut(&id) {
            user.token = token.map(str::to_string);
            user.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }

    async fn set_avatar_url(&self, id: Uuid, avatar_url: &str) -> anyhow::Result<()> {
        if let Some(user) = self.users.lock().await.get_mut(&id) {
            user.avatar_url = Some(avatar_url.to_string());
            user.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }
}
