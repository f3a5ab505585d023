use anyhow::Context;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tokio::sync::OnceCell;
use tracing::error;

/// Salted argon2 hash, returned as a PHC string.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

// Async entry points: argon2 must not run on the runtime workers.

pub async fn hash(plain: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&plain))
        .await
        .context("hash task panicked")?
}

pub async fn verify(plain: String, hash: String) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || verify_password(&plain, &hash))
        .await
        .context("verify task panicked")?
}

static DUMMY_HASH: OnceCell<String> = OnceCell::const_new();

/// Runs a full verification against a throwaway hash, so a login for an
/// unknown email costs as much as one with a wrong password.
pub async fn verify_dummy(plain: String) -> anyhow::Result<()> {
    let hash = DUMMY_HASH
        .get_or_try_init(|| hash("no-such-account".to_string()))
        .await?
        .clone();
    verify(plain, hash).await?;
    Ok(())
}
