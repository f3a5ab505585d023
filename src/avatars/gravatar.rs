use sha2::{Digest, Sha256};

/// Default avatar for a new account: the Gravatar for `email`, falling back to
/// a generated "retro" image, sized like uploaded avatars.
pub fn gravatar_url(email: &str) -> String {
    let digest = Sha256::digest(email.trim().to_lowercase().as_bytes());
    format!(
        "https://www.gravatar.com/avatar/{}?s={}&d=retro",
        hex::encode(digest),
        super::services::AVATAR_SIZE
    )
}
