pub mod auth;
pub mod guards;
pub mod logging;

pub use auth::{JwtAuth, UserId};
pub use guards::User;
pub use logging::RequestLogging;
