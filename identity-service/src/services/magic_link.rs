//! Magic-link issuer: one-time enrollment tokens exchangeable for a session.

use std::sync::Arc;

use crate::models::{LoginToken, TokenPurpose};
use crate::services::{error::ServiceError, EmailProvider};

/// Issues and consumes one-time login/signup tokens. Token values are
/// opaque random strings persisted server-side, never signed credentials:
/// they stay valid (and revocable) independent of signing-key rotation.
#[derive(Clone)]
pub struct MagicLinkService {
    db: crate::services::Database,
    email: Arc<dyn EmailProvider>,
    ttl_seconds: i64,
}

impl MagicLinkService {
    pub fn new(
        db: crate::services::Database,
        email: Arc<dyn EmailProvider>,
        ttl_seconds: i64,
    ) -> Self {
        Self {
            db,
            email,
            ttl_seconds,
        }
    }

    /// Create a one-time token for an identifier and send the link out of
    /// band. Returns the raw token value (for tests and link construction).
    pub async fn issue(
        &self,
        identifier: &str,
        purpose: TokenPurpose,
        base_url: &str,
    ) -> Result<String, ServiceError> {
        let token = LoginToken::new(identifier.to_string(), purpose, self.ttl_seconds);

        self.db.insert_login_token(&token).await?;

        self.email
            .send_magic_link_email(identifier, &token.token, purpose, base_url)
            .await
            .map_err(|e| ServiceError::EmailError(e.to_string()))?;

        tracing::info!(identifier = %identifier, purpose = %purpose.as_str(), "Magic link issued");

        Ok(token.token)
    }

    /// Consume a one-time token. Exactly-once: the store marks the row used
    /// in the same statement that validates it, so a concurrent second
    /// consume fails with `LinkAlreadyUsed`.
    pub async fn consume(&self, raw_token: &str) -> Result<(String, TokenPurpose), ServiceError> {
        let token = self.db.consume_login_token(raw_token).await?;

        let purpose: TokenPurpose = token
            .purpose
            .parse()
            .map_err(|e: String| ServiceError::Internal(anyhow::anyhow!(e)))?;

        tracing::info!(identifier = %token.identifier, purpose = %token.purpose, "Magic link consumed");

        Ok((token.identifier, purpose))
    }
}
