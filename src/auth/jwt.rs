use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::claims::Claims;
use crate::state::AppState;

/// Sessions expire this long after login.
pub const SESSION_TTL: Duration = Duration::hours(20);

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::new(&state.config.jwt.secret)
    }
}

impl JwtKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn sign(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.sign_at(user_id, OffsetDateTime::now_utc())
    }

    fn sign_at(&self, user_id: Uuid, issued_at: OffsetDateTime) -> anyhow::Result<String> {
        let exp = issued_at + SESSION_TTL;
        let claims = Claims {
            sub: user_id,
            iat: issued_at.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(token)
    }

    /// Checks signature and expiry only; session revocation is the extractor's job.
    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}
