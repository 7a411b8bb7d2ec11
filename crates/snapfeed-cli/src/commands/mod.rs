//! Subcommand handlers.

pub mod capture;
pub mod run;
mod wiring;
pub mod worker;

pub use capture::CaptureArgs;
pub use run::RunArgs;
pub use worker::WorkerArgs;
