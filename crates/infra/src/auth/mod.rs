//! Authentication adapters.
//!
//! - [`oauth`]: authorization URL, code exchange and refresh against the
//!   server's token endpoint, all DPoP-bound
//! - [`password`]: legacy identifier + app password sessions
//! - [`pending`]: the in-flight authorization attempt between redirect and
//!   callback
//! - [`callback`]: finishing an authorization from the redirect parameters
//! - [`session_store`]: sealed persistence of the signed-in session
//! - [`refresher`]: the [`TokenRefresher`](panelpost_core::TokenRefresher)
//!   used by the freshness policy

pub mod callback;
pub mod oauth;
pub mod password;
pub mod pending;
pub mod refresher;
pub mod session_store;

pub use callback::{handle_callback, CallbackOutcome, CallbackParams};
pub use oauth::{AuthorizationPreparation, OAuthClient};
pub use password::PasswordAuthClient;
pub use pending::{PendingAuthorization, PendingAuthorizationStore};
pub use refresher::AtProtoRefresher;
pub use session_store::SessionPersistence;

/// Current time in epoch milliseconds.
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
