//! User-facing actions behind the CLI subcommands.

pub mod auth;
pub mod post;
pub mod schedule;

pub use auth::{account_summary, authorize, complete_authorization, login, sign_out};
pub use post::{post_now, prepare_plan, schedule_post, PostRequest};
pub use schedule::{cancel_scheduled, list_scheduled, run_scheduler};
