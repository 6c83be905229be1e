//! PostgreSQL persistence for sessions, one-time tokens and user lookups.
//!
//! The session store is the durable source of truth for which logical
//! logins are currently valid, and enforces the per-subject concurrency
//! ceiling inside a single transaction.

use chrono::Utc;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use crate::models::{DeviceInfo, LoginToken, Session, User};
use crate::services::error::ServiceError;

/// PostgreSQL database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database wrapper from a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ==================== User Operations ====================

    /// Find user by ID.
    pub async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, ServiceError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(ServiceError::Database)
    }

    /// Find user by email (case-insensitive).
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(ServiceError::Database)
    }

    /// Insert a new user (signup enrollment path).
    pub async fn insert_user(&self, user: &User) -> Result<(), ServiceError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, tenant_id, email, name, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.id)
        .bind(user.tenant_id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(ServiceError::Database)?;
        Ok(())
    }

    // ==================== Session Operations ====================

    /// Create a session for a subject, enforcing the concurrency ceiling.
    ///
    /// Runs as one transaction: the owning user row is locked so two
    /// simultaneous logins for the same subject cannot both pass the count,
    /// then the oldest active sessions are revoked down to `max_concurrent - 1`
    /// before the insert. Evicted sessions are revoked, not deleted.
    pub async fn create_session(
        &self,
        user_id: Uuid,
        device: &DeviceInfo,
        ttl_seconds: i64,
        max_concurrent: i64,
    ) -> Result<Session, ServiceError> {
        let session = Session::new(user_id, device, ttl_seconds);

        let mut tx = self.pool.begin().await.map_err(ServiceError::Database)?;

        // Per-subject serialization point for the count-evict-insert sequence.
        let locked: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM users WHERE id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(ServiceError::Database)?;

        if locked.is_none() {
            return Err(ServiceError::UserNotFound);
        }

        let (active_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sessions WHERE user_id = $1 AND is_active AND expires > now()",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(ServiceError::Database)?;

        let over_limit = active_count - (max_concurrent - 1);
        if over_limit > 0 {
            let evicted = sqlx::query(
                r#"
                UPDATE sessions SET is_active = FALSE, revoked_at = now()
                WHERE id IN (
                    SELECT id FROM sessions
                    WHERE user_id = $1 AND is_active AND expires > now()
                    ORDER BY created_at ASC
                    LIMIT $2
                )
                "#,
            )
            .bind(user_id)
            .bind(over_limit)
            .execute(&mut *tx)
            .await
            .map_err(ServiceError::Database)?;

            tracing::info!(
                user_id = %user_id,
                evicted = evicted.rows_affected(),
                "Session ceiling reached, evicted oldest active session(s)"
            );
        }

        sqlx::query(
            r#"
            INSERT INTO sessions
                (id, user_id, session_token, expires, is_active, revoked_at,
                 device_type, browser, ip, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.session_token)
        .bind(session.expires)
        .bind(session.is_active)
        .bind(session.revoked_at)
        .bind(&session.device_type)
        .bind(&session.browser)
        .bind(&session.ip)
        .bind(session.created_at)
        .execute(&mut *tx)
        .await
        .map_err(ServiceError::Database)?;

        tx.commit().await.map_err(ServiceError::Database)?;

        Ok(session)
    }

    /// Find a session by ID.
    pub async fn find_session_by_id(
        &self,
        session_id: Uuid,
    ) -> Result<Option<Session>, ServiceError> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(ServiceError::Database)
    }

    /// Check whether a session is still live. This is the strongly
    /// consistent read used by refresh and revocation checks; the access
    /// credential fast path deliberately skips it.
    pub async fn is_session_active(&self, session_id: Uuid) -> Result<bool, ServiceError> {
        let row: Option<(bool,)> = sqlx::query_as(
            "SELECT TRUE FROM sessions WHERE id = $1 AND is_active AND expires > now()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(ServiceError::Database)?;
        Ok(row.is_some())
    }

    /// Revoke a session. Idempotent: revoking an already-inactive session
    /// is a no-op.
    pub async fn revoke_session(&self, session_id: Uuid) -> Result<(), ServiceError> {
        sqlx::query(
            "UPDATE sessions SET is_active = FALSE, revoked_at = $2 WHERE id = $1 AND is_active",
        )
        .bind(session_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(ServiceError::Database)?;
        Ok(())
    }

    /// Revoke every active session for a subject ("log out everywhere").
    pub async fn revoke_all_sessions(&self, user_id: Uuid) -> Result<u64, ServiceError> {
        let result = sqlx::query(
            "UPDATE sessions SET is_active = FALSE, revoked_at = $2 WHERE user_id = $1 AND is_active",
        )
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(ServiceError::Database)?;
        Ok(result.rows_affected())
    }

    /// List a subject's live sessions, newest first.
    pub async fn list_active_sessions(&self, user_id: Uuid) -> Result<Vec<Session>, ServiceError> {
        sqlx::query_as::<_, Session>(
            r#"
            SELECT * FROM sessions
            WHERE user_id = $1 AND is_active AND expires > now()
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(ServiceError::Database)
    }

    // ==================== One-Time Token Operations ====================

    /// Insert a one-time login token row.
    pub async fn insert_login_token(&self, token: &LoginToken) -> Result<(), ServiceError> {
        sqlx::query(
            r#"
            INSERT INTO verification_tokens (identifier, token, expires, used_at, type, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&token.identifier)
        .bind(&token.token)
        .bind(token.expires)
        .bind(token.used_at)
        .bind(&token.purpose)
        .bind(token.created_at)
        .execute(&self.pool)
        .await
        .map_err(ServiceError::Database)?;
        Ok(())
    }

    /// Atomically consume a one-time token: the conditional UPDATE marks it
    /// used and returns the row in one statement, so two concurrent consumes
    /// of the same token produce exactly one winner.
    ///
    /// On failure a follow-up read classifies the reason (absent, expired,
    /// already used); that read is outside the atomic step and only feeds
    /// the error kind.
    pub async fn consume_login_token(&self, raw_token: &str) -> Result<LoginToken, ServiceError> {
        let consumed = sqlx::query_as::<_, LoginToken>(
            r#"
            UPDATE verification_tokens SET used_at = now()
            WHERE token = $1 AND used_at IS NULL AND expires > now()
            RETURNING identifier, token, expires, used_at, type, created_at
            "#,
        )
        .bind(raw_token)
        .fetch_optional(&self.pool)
        .await
        .map_err(ServiceError::Database)?;

        if let Some(token) = consumed {
            return Ok(token);
        }

        let existing = sqlx::query_as::<_, LoginToken>(
            "SELECT * FROM verification_tokens WHERE token = $1",
        )
        .bind(raw_token)
        .fetch_optional(&self.pool)
        .await
        .map_err(ServiceError::Database)?;

        match existing {
            None => Err(ServiceError::LinkNotFound),
            Some(t) if t.is_used() => Err(ServiceError::LinkAlreadyUsed),
            Some(_) => Err(ServiceError::LinkExpired),
        }
    }
}
