pub mod database;
pub mod email;
pub mod error;
pub mod identity;
pub mod jwt;
pub mod magic_link;
pub mod session;

pub use database::Database;
pub use email::{EmailProvider, EmailService};
pub use error::ServiceError;
pub use identity::{Identity, IdentityResolver};
pub use jwt::{AccessClaims, Claims, JwtService, RefreshClaims, TokenError, TokenPair, TokenResponse};
pub use magic_link::MagicLinkService;
pub use session::SessionService;
