//! XRPC client for the resource server.
//!
//! Implements the [`PostingApi`](panelpost_core::PostingApi) port: blob
//! upload and record creation, each authenticated per attempt through the
//! caller's [`AuthContext`](panelpost_core::AuthContext) and retried on
//! transient failures.

pub mod xrpc;

pub use xrpc::XrpcClient;
