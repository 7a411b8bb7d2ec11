//! X API v2 client and response types.
//!
//! A thin HTTP layer: typed requests/responses, bearer authentication,
//! rate-limit header parsing, and error mapping. All fetch policy (time
//! windows, grouping, thread reconstruction) lives in [`crate::fetcher`].

mod client;
pub mod types;

pub use client::XApiClient;
