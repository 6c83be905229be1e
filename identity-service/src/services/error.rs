use thiserror::Error;

use crate::error::AppError;
use crate::services::jwt::TokenError;

/// Internal failure taxonomy for the auth services. The distinct kinds
/// exist for logging; user-facing responses collapse them so verification
/// failures never become a forgery/expiry oracle.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Invalid credential: {0}")]
    InvalidCredential(TokenError),

    #[error("Session revoked or expired")]
    SessionRevoked,

    #[error("Link token not found")]
    LinkNotFound,

    #[error("Link token expired")]
    LinkExpired,

    #[error("Link token already used")]
    LinkAlreadyUsed,

    #[error("User not found")]
    UserNotFound,

    #[error("Email already registered")]
    EmailAlreadyRegistered,

    #[error("Email error: {0}")]
    EmailError(String),
}

impl From<TokenError> for ServiceError {
    fn from(err: TokenError) -> Self {
        ServiceError::InvalidCredential(err)
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Database(e) => AppError::DatabaseError(anyhow::anyhow!(e)),
            ServiceError::Internal(e) => AppError::InternalError(e),
            // Malformed, forged, expired and revoked all collapse into one
            // unauthenticated outcome; the kind survives only in logs.
            ServiceError::InvalidCredential(kind) => {
                tracing::debug!(kind = %kind, "Credential rejected");
                AppError::Unauthorized(anyhow::anyhow!("Authentication required"))
            }
            ServiceError::SessionRevoked => {
                tracing::debug!("Credential rejected: session no longer active");
                AppError::Unauthorized(anyhow::anyhow!("Authentication required"))
            }
            // Magic-link failures likewise collapse into one message.
            ServiceError::LinkNotFound | ServiceError::LinkExpired | ServiceError::LinkAlreadyUsed => {
                tracing::debug!(kind = %err, "Magic link rejected");
                AppError::Unauthorized(anyhow::anyhow!("Invalid or expired link"))
            }
            ServiceError::UserNotFound => {
                AppError::Unauthorized(anyhow::anyhow!("Authentication required"))
            }
            ServiceError::EmailAlreadyRegistered => {
                AppError::Conflict(anyhow::anyhow!("Email already registered"))
            }
            ServiceError::EmailError(e) => AppError::EmailError(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    fn status_of(err: ServiceError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn test_all_credential_failures_collapse_to_401() {
        assert_eq!(
            status_of(ServiceError::InvalidCredential(TokenError::Malformed)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(ServiceError::InvalidCredential(TokenError::InvalidSignature)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(ServiceError::InvalidCredential(TokenError::Expired)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(status_of(ServiceError::SessionRevoked), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_link_failures_share_one_message() {
        let a = AppError::from(ServiceError::LinkNotFound).to_string();
        let b = AppError::from(ServiceError::LinkExpired).to_string();
        let c = AppError::from(ServiceError::LinkAlreadyUsed).to_string();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }
}
