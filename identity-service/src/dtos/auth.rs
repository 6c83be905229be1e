use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::TokenPurpose;

/// Request a magic link for passwordless login or signup.
#[derive(Debug, Deserialize, Validate)]
pub struct MagicLinkRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    pub purpose: TokenPurpose,
}

/// Query parameters of the link landing endpoint.
#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
