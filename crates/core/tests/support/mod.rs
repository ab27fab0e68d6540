//! Shared test helpers for `panelpost-core` integration tests.
//!
//! In-memory fakes for the posting and scheduler ports so that tests can
//! focus on behaviour instead of boilerplate.

#![allow(dead_code)]

pub mod posting;
pub mod scheduling;
