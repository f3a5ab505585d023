use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session JWT payload. Carries the user identity and nothing else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // user ID
    pub iat: usize, // issued at (unix timestamp)
    pub exp: usize, // expires at (unix timestamp)
}
