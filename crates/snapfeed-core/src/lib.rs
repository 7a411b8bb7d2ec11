/// Core library for the Snapfeed visual capture and classification pipeline.
///
/// This crate contains all business logic: the post fetcher, the browser
/// renderer, blob storage, the capture orchestrator, text extraction, the
/// classification queue/worker/store, and configuration management. The CLI
/// binary wires these collaborators together at startup.
pub mod blob;
pub mod capture;
pub mod classify;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod llm;
pub mod queue;
pub mod render;
pub mod store;
pub mod taxonomy;
pub mod worker;
pub mod x_api;

pub use error::*;

/// Returns the version of the snapfeed-core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
