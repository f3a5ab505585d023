//! Account lifecycle: registration, email verification, sessions and avatars.
//!
//! Each operation is a plain async function over [`AppState`]. Handlers stay
//! thin and only translate HTTP into these calls.

use axum::extract::FromRef;
use tracing::{error, info, warn};

use crate::{
    auth::{
        dto::{Credentials, PublicUser, Registration},
        jwt::JwtKeys,
        password,
        repo::StoreError,
        repo_types::{NewUser, User, Verification},
        verification::new_verification_token,
    },
    avatars::{self, AvatarUpload},
    error::{AppError, Result},
    mail::verification_mail,
    state::AppState,
};

pub const WRONG_CREDENTIALS: &str = "Email or password wrong";
pub const NOT_VERIFIED: &str = "Email not verify";
pub const EMAIL_IN_USE: &str = "Email already in use";
pub const USER_NOT_FOUND: &str = "User not found";
pub const ALREADY_VERIFIED: &str = "Verification has already been passed";
pub const NO_FILE: &str = "No file uploaded";

/// Creates an unverified account and mails its verification link.
///
/// A failed mail does not undo the account; the user can ask for the link
/// again through [`resend_verify`].
pub async fn register(st: &AppState, input: Registration) -> Result<User> {
    if st.users.find_by_email(&input.email).await?.is_some() {
        warn!(email = %input.email, "email already registered");
        return Err(AppError::Conflict(EMAIL_IN_USE.into()));
    }

    let password_hash = password::hash(input.password).await?;
    let new_user = NewUser {
        avatar_url: avatars::gravatar_url(&input.email),
        verification_token: new_verification_token(),
        username: input.username,
        email: input.email,
        password_hash,
        subscription: input.subscription,
    };

    // The pre-check above races with concurrent registrations; the store's
    // unique constraint has the final word.
    let user = match st.users.insert(new_user).await {
        Ok(user) => user,
        Err(StoreError::DuplicateEmail) => {
            warn!("email registered concurrently");
            return Err(AppError::Conflict(EMAIL_IN_USE.into()));
        }
        Err(StoreError::Other(e)) => return Err(e.into()),
    };

    if let Verification::Pending(token) = user.verification() {
        let mail = verification_mail(&user.email, &st.config.verification_link(token));
        if let Err(e) = st.mailer.send(mail).await {
            error!(error = ?e, user_id = %user.id, "verification mail failed");
        }
    }

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user)
}

/// Consumes a verification token. A second call with the same token finds
/// nobody and fails with `NotFound`.
pub async fn verify(st: &AppState, token: &str) -> Result<()> {
    match st.users.verify_by_token(token).await? {
        Some(user) => {
            info!(user_id = %user.id, "user verified");
            Ok(())
        }
        None => {
            warn!("unknown verification token");
            Err(AppError::not_found(USER_NOT_FOUND))
        }
    }
}

/// Mails the existing verification token again. The token is not rotated.
pub async fn resend_verify(st: &AppState, email: &str) -> Result<()> {
    let user = st
        .users
        .find_by_email(email)
        .await?
        .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))?;

    let token = match user.verification() {
        Verification::Pending(token) => token,
        Verification::Verified => return Err(AppError::bad_request(ALREADY_VERIFIED)),
    };

    st.mailer
        .send(verification_mail(&user.email, &st.config.verification_link(token)))
        .await?;
    info!(user_id = %user.id, "verification mail re-sent");
    Ok(())
}

/// Checks credentials and opens a session. Unknown email and wrong password
/// share one message; an unverified account gets its own.
pub async fn login(st: &AppState, creds: Credentials) -> Result<(String, User)> {
    let Some(mut user) = st.users.find_by_email(&creds.email).await? else {
        warn!(email = %creds.email, "login unknown email");
        password::verify_dummy(creds.password).await?;
        return Err(AppError::unauthorized(WRONG_CREDENTIALS));
    };

    if !user.verify {
        warn!(user_id = %user.id, "login before verification");
        return Err(AppError::unauthorized(NOT_VERIFIED));
    }

    if !password::verify(creds.password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::unauthorized(WRONG_CREDENTIALS));
    }

    let token = JwtKeys::from_ref(st).sign(user.id)?;
    st.users.set_session_token(user.id, Some(&token)).await?;
    user.token = Some(token.clone());

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok((token, user))
}

pub fn current(user: &User) -> PublicUser {
    PublicUser::from(user)
}

/// Drops the stored session marker. The JWT itself stays cryptographically
/// valid until it expires, but the extractor no longer accepts it.
pub async fn logout(st: &AppState, user: &User) -> Result<()> {
    st.users.set_session_token(user.id, None).await?;
    info!(user_id = %user.id, "user logged out");
    Ok(())
}

/// Normalises the uploaded image and makes it the user's avatar.
pub async fn update_avatar(
    st: &AppState,
    user: &User,
    upload: Option<AvatarUpload>,
) -> Result<String> {
    let upload = upload
        .filter(|u| !u.body.is_empty())
        .ok_or_else(|| AppError::bad_request(NO_FILE))?;
    if !avatars::services::is_supported_type(upload.content_type.as_deref()) {
        return Err(AppError::bad_request("Unsupported image type"));
    }

    let avatar_url = avatars::store_avatar(&st.config.avatars_dir(), user.id, upload).await?;
    st.users.set_avatar_url(user.id, &avatar_url).await?;

    info!(user_id = %user.id, avatar_url = %avatar_url, "avatar updated");
    Ok(avatar_url)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use uuid::Uuid;

    use crate::{
        auth::{memory::MemoryUsers, repo::UserRepo, repo_types::Subscription},
        config::AppConfig,
        contacts::memory::MemoryContacts,
        mail::{Mailer, MemoryMailer, OutgoingMail},
    };

    fn state() -> (AppState, Arc<MemoryMailer>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mailer = Arc::new(MemoryMailer::new());
        let st = AppState::in_memory(AppConfig::test_default(dir.path()), mailer.clone());
        (st, mailer, dir)
    }

    fn registration(email: &str) -> Registration {
        Registration {
            username: Some("ann".into()),
            email: email.into(),
            password: "secret".into(),
            subscription: Subscription::Starter,
        }
    }

    fn creds(email: &str, password: &str) -> Credentials {
        Credentials {
            email: email.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn register_creates_pending_user_and_mails_link() {
        let (st, mailer, _dir) = state();
        let user = register(&st, registration("a@x.com")).await.unwrap();

        assert!(!user.verify);
        assert_ne!(user.password_hash, "secret");
        let Verification::Pending(token) = user.verification() else {
            panic!("new user must be pending");
        };
        let mail = mailer.last_to("a@x.com").await.unwrap();
        assert!(mail.html.contains(&st.config.verification_link(token)));
        assert!(user.avatar_url.unwrap().contains("gravatar.com"));
    }

    #[tokio::test]
    async fn register_twice_conflicts() {
        let (st, _, _dir) = state();
        register(&st, registration("a@x.com")).await.unwrap();
        let err = register(&st, registration("a@x.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m == EMAIL_IN_USE));
    }

    /// Store whose email lookup always misses, as when a concurrent
    /// registration commits between the lookup and the insert.
    struct StaleLookupUsers(MemoryUsers);

    #[async_trait::async_trait]
    impl UserRepo for StaleLookupUsers {
        async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
            self.0.find_by_id(id).await
        }
        async fn find_by_email(&self, _email: &str) -> anyhow::Result<Option<User>> {
            Ok(None)
        }
        async fn insert(&self, user: NewUser) -> std::result::Result<User, StoreError> {
            self.0.insert(user).await
        }
        async fn verify_by_token(&self, token: &str) -> anyhow::Result<Option<User>> {
            self.0.verify_by_token(token).await
        }
        async fn set_session_token(&self, id: Uuid, token: Option<&str>) -> anyhow::Result<()> {
            self.0.set_session_token(id, token).await
        }
        async fn set_avatar_url(&self, id: Uuid, avatar_url: &str) -> anyhow::Result<()> {
            self.0.set_avatar_url(id, avatar_url).await
        }
    }

    #[tokio::test]
    async fn duplicate_insert_after_missed_lookup_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let st = AppState::from_parts(
            Arc::new(AppConfig::test_default(dir.path())),
            Arc::new(StaleLookupUsers(MemoryUsers::new())),
            Arc::new(MemoryContacts::new()),
            Arc::new(MemoryMailer::new()),
        );

        register(&st, registration("a@x.com")).await.unwrap();
        let err = register(&st, registration("a@x.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m == EMAIL_IN_USE));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_registrations_yield_one_account() {
        let (st, _, _dir) = state();
        let (a, b) = tokio::join!(
            register(&st, registration("race@x.com")),
            register(&st, registration("race@x.com")),
        );

        let results = [a, b];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(AppError::Conflict(m)) if m == EMAIL_IN_USE)));
    }

    struct BrokenMailer;

    #[async_trait::async_trait]
    impl Mailer for BrokenMailer {
        async fn send(&self, _mail: OutgoingMail) -> anyhow::Result<()> {
            anyhow::bail!("smtp down")
        }
    }

    #[tokio::test]
    async fn mail_failure_keeps_the_account() {
        let dir = tempfile::tempdir().unwrap();
        let st = AppState::in_memory(AppConfig::test_default(dir.path()), Arc::new(BrokenMailer));

        let user = register(&st, registration("a@x.com")).await.unwrap();
        assert!(st.users.find_by_id(user.id).await.unwrap().is_some());

        let err = resend_verify(&st, "a@x.com").await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn verification_lifecycle() {
        let (st, mailer, _dir) = state();
        let user = register(&st, registration("a@x.com")).await.unwrap();
        let token = user.verification_token.clone().unwrap();

        let err = login(&st, creds("a@x.com", "secret")).await.unwrap_err();
        assert_eq!(err.to_string(), NOT_VERIFIED);

        resend_verify(&st, "a@x.com").await.unwrap();
        assert_eq!(mailer.sent().await.len(), 2);
        let stored = st.users.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.verification_token.as_deref(), Some(token.as_str()));

        verify(&st, &token).await.unwrap();
        let err = verify(&st, &token).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = resend_verify(&st, "a@x.com").await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == ALREADY_VERIFIED));

        let (jwt, user) = login(&st, creds("a@x.com", "secret")).await.unwrap();
        assert!(!jwt.is_empty());
        assert!(user.holds_session(&jwt));
    }

    #[tokio::test]
    async fn login_failures_do_not_reveal_which_half_failed() {
        let (st, _, _dir) = state();
        let user = register(&st, registration("a@x.com")).await.unwrap();
        verify(&st, user.verification_token.as_deref().unwrap())
            .await
            .unwrap();

        let unknown = login(&st, creds("b@x.com", "secret")).await.unwrap_err();
        let wrong = login(&st, creds("a@x.com", "not-it")).await.unwrap_err();
        assert_eq!(unknown.to_string(), WRONG_CREDENTIALS);
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert!(matches!(wrong, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn resend_for_unknown_email_is_not_found() {
        let (st, _, _dir) = state();
        let err = resend_verify(&st, "ghost@x.com").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn logout_clears_session() {
        let (st, _, _dir) = state();
        let user = register(&st, registration("a@x.com")).await.unwrap();
        verify(&st, user.verification_token.as_deref().unwrap())
            .await
            .unwrap();
        let (jwt, user) = login(&st, creds("a@x.com", "secret")).await.unwrap();

        logout(&st, &user).await.unwrap();
        let stored = st.users.find_by_id(user.id).await.unwrap().unwrap();
        assert!(!stored.holds_session(&jwt));
    }

    #[tokio::test]
    async fn avatar_requires_a_file() {
        let (st, _, _dir) = state();
        let user = register(&st, registration("a@x.com")).await.unwrap();
        let err = update_avatar(&st, &user, None).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == NO_FILE));
    }

    #[tokio::test]
    async fn avatar_rejects_non_images_up_front() {
        let (st, _, _dir) = state();
        let user = register(&st, registration("a@x.com")).await.unwrap();
        let upload = AvatarUpload {
            file_name: Some("notes.txt".into()),
            content_type: Some("text/plain".into()),
            body: bytes::Bytes::from_static(b"hello"),
        };
        let err = update_avatar(&st, &user, Some(upload)).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
