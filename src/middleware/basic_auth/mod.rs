mod auth;
mod middleware;

pub use auth::{AuthError, UserTable};
pub use middleware::AuthGate;
