//! One-time enrollment token model - opaque magic-link credentials.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// What consuming the link is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenPurpose {
    Login,
    Signup,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::Login => "login",
            TokenPurpose::Signup => "signup",
        }
    }
}

impl std::str::FromStr for TokenPurpose {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "login" => Ok(TokenPurpose::Login),
            "signup" => Ok(TokenPurpose::Signup),
            _ => Err(format!("Invalid token purpose: {}", s)),
        }
    }
}

/// One-time enrollment token entity. Once `used_at` is set the token is
/// permanently spent, regardless of expiry.
#[derive(Debug, Clone, FromRow)]
pub struct LoginToken {
    pub identifier: String,
    pub token: String,
    pub expires: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    #[sqlx(rename = "type")]
    pub purpose: String,
    pub created_at: DateTime<Utc>,
}

impl LoginToken {
    /// Create a new token row with a fresh opaque value.
    pub fn new(identifier: String, purpose: TokenPurpose, ttl_seconds: i64) -> Self {
        let now = Utc::now();
        Self {
            identifier,
            token: generate_opaque_token(),
            expires: now + Duration::seconds(ttl_seconds),
            used_at: None,
            purpose: purpose.as_str().to_string(),
            created_at: now,
        }
    }

    /// Check if the token is still consumable (not expired and not used).
    pub fn is_valid(&self) -> bool {
        self.used_at.is_none() && self.expires > Utc::now()
    }

    /// Check if the token has been consumed.
    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }

    /// Check if the token is past its expiry.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires
    }
}

/// Generate a high-entropy opaque token value. Deliberately unrelated to
/// the signed-credential format: these stay invalidatable independent of
/// signing-key rotation.
pub fn generate_opaque_token() -> String {
    let mut rng = rand::thread_rng();
    let token_bytes: [u8; 32] = rng.gen();
    hex::encode(token_bytes)
}
