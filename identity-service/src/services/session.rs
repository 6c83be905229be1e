//! Session orchestrator: the only place a credential pair is minted or
//! refreshed. Composes the token codec and the session store as one
//! logical operation.

use uuid::Uuid;

use crate::models::{DeviceInfo, Session, User};
use crate::services::{error::ServiceError, Database, JwtService, TokenPair};

#[derive(Clone)]
pub struct SessionService {
    db: Database,
    jwt: JwtService,
    max_concurrent: i64,
}

impl SessionService {
    pub fn new(db: Database, jwt: JwtService, max_concurrent: i64) -> Self {
        Self {
            db,
            jwt,
            max_concurrent,
        }
    }

    /// Mint a session and its credential pair for an authenticated subject.
    /// The session record is created first (evicting the oldest active one
    /// if the subject is at the concurrency ceiling), then both credentials
    /// are issued carrying the new session id.
    pub async fn login(
        &self,
        user: &User,
        device: &DeviceInfo,
    ) -> Result<(Session, TokenPair), ServiceError> {
        let session = self
            .db
            .create_session(
                user.id,
                device,
                self.jwt.refresh_ttl_seconds(),
                self.max_concurrent,
            )
            .await?;

        let pair = self
            .jwt
            .issue_pair(user.id, user.tenant_id, session.id)
            .map_err(ServiceError::Internal)?;

        tracing::info!(user_id = %user.id, session_id = %session.id, "Session created");

        Ok((session, pair))
    }

    /// Exchange a refresh credential for a fresh pair. The credential must
    /// be of refresh kind, and its session must still be live: this check
    /// is strongly consistent with revocation, unlike the access fast path.
    /// The session id is preserved; the refresh credential itself is not
    /// single-use and stays valid until its own TTL or revocation.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ServiceError> {
        let claims = self.jwt.verify_refresh(refresh_token)?;

        if !self.db.is_session_active(claims.sid).await? {
            tracing::info!(session_id = %claims.sid, "Refresh rejected: session not active");
            return Err(ServiceError::SessionRevoked);
        }

        // The subject may have been deleted while the session was live.
        let user = self
            .db
            .find_user_by_id(claims.sub)
            .await?
            .ok_or(ServiceError::UserNotFound)?;

        let pair = self
            .jwt
            .issue_pair(user.id, user.tenant_id, claims.sid)
            .map_err(ServiceError::Internal)?;

        tracing::info!(user_id = %user.id, session_id = %claims.sid, "Credential pair refreshed");

        Ok(pair)
    }

    /// Revoke a single session (logout). Idempotent.
    pub async fn logout(&self, session_id: Uuid) -> Result<(), ServiceError> {
        self.db.revoke_session(session_id).await?;
        tracing::info!(session_id = %session_id, "Session revoked");
        Ok(())
    }

    /// Revoke every active session of a subject ("log out everywhere").
    pub async fn logout_all(&self, user_id: Uuid) -> Result<u64, ServiceError> {
        let revoked = self.db.revoke_all_sessions(user_id).await?;
        tracing::info!(user_id = %user_id, revoked = revoked, "All sessions revoked");
        Ok(revoked)
    }
}
