//! Integration tests for AppContext lifecycle
//!
//! Contexts are created over temporary directories, signed in, dropped and
//! recreated to check that sessions survive restarts and that signing out
//! forgets them.

mod support;

use panelpost_app::commands;
use panelpost_domain::PanelPostError;
use tempfile::TempDir;
use wiremock::MockServer;

use support::{context, mount_login, DID, HANDLE};

/// Validates a fresh context starts signed out.
///
/// Assertions:
/// - No account summary
/// - Asking for an auth context fails with `Auth`
#[tokio::test(flavor = "multi_thread")]
async fn test_fresh_context_is_signed_out() {
    let root = TempDir::new().expect("temp dir");
    let ctx = context(root.path(), "http://127.0.0.1:9").await;

    assert!(commands::account_summary(&ctx).is_none());
    let err = ctx.fresh_auth_context().await.expect_err("nobody signed in");
    assert!(matches!(err, PanelPostError::Auth(_)), "unexpected error: {err:?}");
}

/// Validates an app password session survives a restart.
///
/// Assertions:
/// - `login` returns the account handle and DID
/// - A second context over the same directories restores the session
/// - The restored auth context targets the configured service
#[tokio::test(flavor = "multi_thread")]
async fn test_login_is_restored_by_next_context() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    let root = TempDir::new().expect("temp dir");

    let first = context(root.path(), &server.uri()).await;
    let session = commands::login(&first, HANDLE, "app-pw").await.expect("login");
    assert_eq!(session.did, DID);
    assert_eq!(session.handle, HANDLE);
    drop(first);

    let second = context(root.path(), &server.uri()).await;
    let summary = commands::account_summary(&second).expect("restored");
    assert!(summary.contains(HANDLE), "summary was {summary}");

    let auth = second.fresh_auth_context().await.expect("auth context");
    assert_eq!(auth.repo_did(), DID);
    assert_eq!(auth.base_url(), server.uri());
}

/// Validates signing out clears the cache and the stores.
///
/// Assertions:
/// - The signed-out context has no summary
/// - A later context over the same directories restores nothing
#[tokio::test(flavor = "multi_thread")]
async fn test_sign_out_forgets_sessions() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    let root = TempDir::new().expect("temp dir");

    let ctx = context(root.path(), &server.uri()).await;
    commands::login(&ctx, HANDLE, "app-pw").await.expect("login");
    commands::sign_out(&ctx).await.expect("sign out");
    assert!(commands::account_summary(&ctx).is_none());
    drop(ctx);

    let later = context(root.path(), &server.uri()).await;
    assert!(commands::account_summary(&later).is_none());
}

/// Validates OAuth commands are refused when OAuth is not configured.
#[tokio::test(flavor = "multi_thread")]
async fn test_authorize_requires_oauth_config() {
    let root = TempDir::new().expect("temp dir");
    let ctx = context(root.path(), "http://127.0.0.1:9").await;

    let err = commands::authorize(&ctx).await.expect_err("no oauth config");
    assert!(matches!(err, PanelPostError::Config(_)), "unexpected error: {err:?}");
}
