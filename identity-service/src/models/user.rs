//! User model - the profile records consumed by the resolve path.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// User entity. Owned by the host application; this service reads it to
/// resolve request identity and creates rows on magic-link signup.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new user for the signup enrollment path.
    pub fn new(email: String, name: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: None,
            email,
            name,
            created_at: Utc::now(),
        }
    }
}

/// User response for API (no internal fields).
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            tenant_id: u.tenant_id,
            email: u.email,
            name: u.name,
            created_at: u.created_at,
        }
    }
}
