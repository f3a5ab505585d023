use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("email already in use")]
    DuplicateEmail,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Persistence for user accounts.
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    /// Fails with [`StoreError::DuplicateEmail`] when the email is taken.
    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;
    /// Marks the holder of `token` verified and blanks the token in one step.
    /// Returns `None` when nobody holds it.
    async fn verify_by_token(&self, token: &str) -> anyhow::Result<Option<User>>;
    async fn set_session_token(&self, id: Uuid, token: Option<&str>) -> anyhow::Result<()>;
    async fn set_avatar_url(&self, id: Uuid, avatar_url: &str) -> anyhow::Result<()>;
}

const EMAIL_UNIQUE: &str = "users_email_key";

/// Only a clash on the email constraint is a duplicate account; any other
/// violation (say, on `verification_token`) is an internal failure.
fn insert_error(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::Database(db)
            if db.is_unique_violation() && db.constraint() == Some(EMAIL_UNIQUE) =>
        {
            StoreError::DuplicateEmail
        }
        other => StoreError::Other(anyhow::Error::new(other).context("insert user")),
    }
}

const USER_COLUMNS: &str = "id, username, email, password_hash, subscription, avatar_url, \
     token, verify, verification_token, created_at, updated_at";

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
impl UserRepo for PgUsers {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find user by id")?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await
            .context("find user by email")?;
        Ok(user)
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO users
                (id, username, email, password_hash, subscription, avatar_url, verification_token)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.subscription)
            .bind(&user.avatar_url)
            .bind(&user.verification_token)
            .fetch_one(&self.db)
            .await
            .map_err(insert_error)
    }

    async fn verify_by_token(&self, token: &str) -> anyhow::Result<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users
               SET verify = TRUE, verification_token = NULL, updated_at = now()
             WHERE verification_token = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(token)
            .fetch_optional(&self.db)
            .await
            .context("verify user by token")?;
        Ok(user)
    }

    async fn set_session_token(&self, id: Uuid, token: Option<&str>) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET token = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(token)
            .execute(&self.db)
            .await
            .context("set session token")?;
        Ok(())
    }

    async fn set_avatar_url(&self, id: Uuid, avatar_url: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET avatar_url = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(avatar_url)
            .execute(&self.db)
            .await
            .context("set avatar url")?;
        Ok(())
    }
}
