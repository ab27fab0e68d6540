//! HTTP transport shared by the token, session and XRPC clients.

pub mod client;

pub use client::{HttpClient, HttpClientBuilder};
