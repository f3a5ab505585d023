use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    auth::repo_types::{Subscription, User},
    error::AppError,
};

pub const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn require_email(email: Option<&str>) -> Result<String, AppError> {
    let email = email
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::bad_request("missing required field email"))?;
    if !is_valid_email(email) {
        return Err(AppError::bad_request("Invalid email"));
    }
    Ok(email.to_string())
}

fn require_password(password: Option<&str>) -> Result<String, AppError> {
    let password = password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::bad_request("missing required field password"))?;
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(password.to_string())
}

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub subscription: Option<Subscription>,
}

/// Registration input after validation.
#[derive(Debug)]
pub struct Registration {
    pub username: Option<String>,
    pub email: String,
    pub password: String,
    pub subscription: Subscription,
}

impl RegisterRequest {
    pub fn validate(self) -> Result<Registration, AppError> {
        Ok(Registration {
            username: self.username.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()),
            email: require_email(self.email.as_deref())?,
            password: require_password(self.password.as_deref())?,
            subscription: self.subscription.unwrap_or_default(),
        })
    }
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(self) -> Result<Credentials, AppError> {
        Ok(Credentials {
            email: require_email(self.email.as_deref())?,
            password: require_password(self.password.as_deref())?,
        })
    }
}

/// Request body for re-sending the verification mail.
#[derive(Debug, Deserialize)]
pub struct ResendVerifyRequest {
    pub email: Option<String>,
}

impl ResendVerifyRequest {
    pub fn validate(self) -> Result<String, AppError> {
        require_email(self.email.as_deref())
    }
}

/// Public part of the user returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub email: String,
    pub subscription: Subscription,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            subscription: user.subscription,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: PublicUser,
}

/// Response returned after login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AvatarResponse {
    #[serde(rename = "avatarURL")]
    pub avatar_url: String,
}
