//! Request identity resolver: the fast read path behind every protected
//! request.

use uuid::Uuid;

use crate::models::User;
use crate::services::{error::ServiceError, Database, JwtService};

/// The authenticated identity attached to a request.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user: User,
    pub session_id: Uuid,
    pub tenant_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct IdentityResolver {
    db: Database,
    jwt: JwtService,
}

impl IdentityResolver {
    pub fn new(db: Database, jwt: JwtService) -> Self {
        Self { db, jwt }
    }

    /// Resolve an access credential into an identity, or nothing.
    ///
    /// Verifies the signature and expiry, then loads the subject's profile.
    /// Deliberately does not consult the session store: revocation reaches
    /// this path only once the short access TTL elapses, which is the
    /// documented staleness bound.
    pub async fn resolve(&self, access_token: &str) -> Result<Option<Identity>, ServiceError> {
        let claims = match self.jwt.verify_access(access_token) {
            Ok(claims) => claims,
            Err(kind) => {
                tracing::debug!(kind = %kind, "Access credential rejected");
                return Ok(None);
            }
        };

        let Some(user) = self.db.find_user_by_id(claims.sub).await? else {
            tracing::debug!(user_id = %claims.sub, "Access credential for missing subject");
            return Ok(None);
        };

        Ok(Some(Identity {
            user,
            session_id: claims.sid,
            tenant_id: claims.tenant_id,
        }))
    }
}
