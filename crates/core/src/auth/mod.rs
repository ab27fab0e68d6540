//! Authentication capability shared by both login schemes.

pub mod cache;
pub mod context;
pub mod fresh;
pub mod ports;

pub use cache::{CachedSession, SessionCache};
pub use context::{build_dpop_auth_header, AuthContext, AuthHeaders};
pub use fresh::{ensure_fresh_auth_context, FreshAuth, FreshnessInput};
pub use ports::TokenRefresher;
