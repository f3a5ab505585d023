use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Subscription tier of an account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subscription", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Subscription {
    #[default]
    Starter,
    Pro,
    Business,
}

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: Option<String>,
    pub email: String,
    pub password_hash: String,          // argon2 PHC string
    pub subscription: Subscription,
    pub avatar_url: Option<String>,
    pub token: Option<String>,          // mirrored session token, None after logout
    pub verify: bool,
    pub verification_token: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Where a user stands in the email confirmation lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification<'a> {
    Pending(&'a str),
    Verified,
}

impl User {
    pub fn verification(&self) -> Verification<'_> {
        match (self.verify, self.verification_token.as_deref()) {
            (false, Some(token)) => Verification::Pending(token),
            _ => Verification::Verified,
        }
    }

    /// True when `token` is the session this user currently holds.
    pub fn holds_session(&self, token: &str) -> bool {
        self.token.as_deref() == Some(token)
    }
}

/// Everything needed to insert a fresh, unverified account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub subscription: Subscription,
    pub avatar_url: String,
    pub verification_token: String,
}
