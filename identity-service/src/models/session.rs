//! Session model - one durable record per logical login.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Device metadata captured at login, derived from request headers.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub device_type: String,
    pub browser: String,
    pub ip: String,
}

impl DeviceInfo {
    pub fn unknown() -> Self {
        Self {
            device_type: "unknown".to_string(),
            browser: "unknown".to_string(),
            ip: "unknown".to_string(),
        }
    }
}

/// Session entity. Mutated only through the revoke transitions; expiry is
/// passive, verification just rejects past `expires`.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub session_token: String,
    pub expires: DateTime<Utc>,
    pub is_active: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub device_type: String,
    pub browser: String,
    pub ip: String,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session record.
    pub fn new(user_id: Uuid, device: &DeviceInfo, ttl_seconds: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            session_token: super::login_token::generate_opaque_token(),
            expires: now + Duration::seconds(ttl_seconds),
            is_active: true,
            revoked_at: None,
            device_type: device.device_type.clone(),
            browser: device.browser.clone(),
            ip: device.ip.clone(),
            created_at: now,
        }
    }

    /// Check if the session is live (active and not past expiry).
    pub fn is_live(&self) -> bool {
        self.is_active && self.expires > Utc::now()
    }

    /// Check if the session is past its expiry.
    pub fn is_expired(&self) -> bool {
        self.expires <= Utc::now()
    }

    /// Check if the session was explicitly revoked.
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }
}

/// Session info for API responses.
#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub session_id: Uuid,
    pub device_type: String,
    pub browser: String,
    pub ip: String,
    pub created_at: DateTime<Utc>,
    pub expires: DateTime<Utc>,
    pub is_current: bool,
}

impl From<Session> for SessionInfo {
    fn from(s: Session) -> Self {
        Self {
            session_id: s.id,
            device_type: s.device_type,
            browser: s.browser,
            ip: s.ip,
            created_at: s.created_at,
            expires: s.expires,
            is_current: false, // Set by caller
        }
    }
}
