pub mod login_token;
pub mod session;
pub mod user;

pub use login_token::{LoginToken, TokenPurpose};
pub use session::{DeviceInfo, Session, SessionInfo};
pub use user::{User, UserResponse};
