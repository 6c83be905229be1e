//! Token codec: issues and verifies the signed credential pair without any
//! storage lookup.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::JwtConfig;

/// JWT service for credential generation and verification. The signing
/// secret is passed in through configuration, never read from a global.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
}

/// Internal verification failure taxonomy. Callers outside the auth
/// services must only ever see the collapsed "unauthenticated" outcome;
/// the distinct kind is kept for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("wrong token kind")]
    WrongKind,
}

/// Claim set embedded in every signed credential. The `kind` discriminant
/// is matched before any field is trusted, so an access credential can
/// never stand in for a refresh credential or vice versa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Claims {
    Access(AccessClaims),
    Refresh(RefreshClaims),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user ID)
    pub sub: Uuid,
    /// Tenant the subject belongs to, if any
    pub tenant_id: Option<Uuid>,
    /// Session this credential is bound to
    pub sid: Uuid,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Subject (user ID)
    pub sub: Uuid,
    /// Tenant the subject belongs to, if any
    pub tenant_id: Option<Uuid>,
    /// Session this credential is bound to
    pub sid: Uuid,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// The two credentials handed to the client together, sharing a session id.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub session_id: Uuid,
}

/// Token response returned to client
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl JwtService {
    /// Create a new JWT service from the configured symmetric secret.
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            access_ttl_seconds: config.access_token_ttl_seconds,
            refresh_ttl_seconds: config.refresh_token_ttl_seconds,
        }
    }

    /// Generate an access credential bound to a session.
    pub fn issue_access(
        &self,
        user_id: Uuid,
        tenant_id: Option<Uuid>,
        session_id: Uuid,
    ) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.access_ttl_seconds);

        self.sign(&Claims::Access(AccessClaims {
            sub: user_id,
            tenant_id,
            sid: session_id,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        }))
    }

    /// Generate a refresh credential bound to a session.
    pub fn issue_refresh(
        &self,
        user_id: Uuid,
        tenant_id: Option<Uuid>,
        session_id: Uuid,
    ) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.refresh_ttl_seconds);

        self.sign(&Claims::Refresh(RefreshClaims {
            sub: user_id,
            tenant_id,
            sid: session_id,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        }))
    }

    /// Generate the access + refresh pair for a session.
    pub fn issue_pair(
        &self,
        user_id: Uuid,
        tenant_id: Option<Uuid>,
        session_id: Uuid,
    ) -> Result<TokenPair, anyhow::Error> {
        Ok(TokenPair {
            access_token: self.issue_access(user_id, tenant_id, session_id)?,
            refresh_token: self.issue_refresh(user_id, tenant_id, session_id)?,
            session_id,
        })
    }

    /// Verify a credential expected to be of access kind.
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        match self.verify(token)? {
            Claims::Access(claims) => Ok(claims),
            Claims::Refresh(_) => Err(TokenError::WrongKind),
        }
    }

    /// Verify a credential expected to be of refresh kind.
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        match self.verify(token)? {
            Claims::Refresh(claims) => Ok(claims),
            Claims::Access(_) => Err(TokenError::WrongKind),
        }
    }

    /// Get access credential TTL in seconds (for client info and cookies).
    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl_seconds
    }

    /// Get refresh credential TTL in seconds.
    pub fn refresh_ttl_seconds(&self) -> i64 {
        self.refresh_ttl_seconds
    }

    fn sign(&self, claims: &Claims) -> Result<String, anyhow::Error> {
        let header = Header::new(Algorithm::HS256);
        encode(&header, claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode token: {}", e))
    }

    fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
                use jsonwebtoken::errors::ErrorKind;
                match e.kind() {
                    ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                    ErrorKind::ExpiredSignature => TokenError::Expired,
                    ErrorKind::ImmatureSignature => TokenError::Expired,
                    _ => TokenError::Malformed,
                }
            })?;

        let claims = token_data.claims;

        // The library's expiry check is strict-less-than, which would admit
        // a credential at the exact expiry instant. Expiry is inclusive: a
        // credential is dead from `exp` itself onward.
        let exp = match &claims {
            Claims::Access(c) => c.exp,
            Claims::Refresh(c) => c.exp,
        };
        if Utc::now().timestamp() >= exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    pub fn token_response(&self, pair: &TokenPair) -> TokenResponse {
        TokenResponse {
            access_token: pair.access_token.clone(),
            refresh_token: pair.refresh_token.clone(),
            token_type: "Bearer".to_string(),
            expires_in: self.access_ttl_seconds,
        }
    }
}
