use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};

pub const VERIFICATION_TOKEN_LEN: usize = 32;

/// Fresh email verification token. Tokens never expire; they are consumed by
/// a successful verification.
pub fn new_verification_token() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(VERIFICATION_TOKEN_LEN)
        .map(char::from)
        .collect()
}
