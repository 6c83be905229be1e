pub mod auth;
pub mod cookies;

pub use auth::{auth_middleware, AuthUser};
