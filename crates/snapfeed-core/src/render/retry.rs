//! Browser failure categorization and retry backoff.
//!
//! Session-construction failures fall into three buckets keyed off the
//! driver's message: transient failures are retried with exponential
//! backoff, permanent failures fail fast, and unknown failures are treated
//! as transient but logged louder.

use std::time::Duration;

/// How a browser failure should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Retry with backoff.
    Transient,
    /// Fail fast; retrying cannot help.
    Permanent,
    /// Unrecognized; retried like a transient but logged at WARN.
    Unknown,
}

/// Message substrings that indicate a transient driver failure.
const TRANSIENT_MARKERS: &[&str] = &[
    "connection",
    "timeout",
    "session not created",
    "temporarily unavailable",
    "busy",
];

/// Message substrings that indicate a permanent driver failure.
const PERMANENT_MARKERS: &[&str] = &[
    "not found",
    "executable",
    "permission denied",
    "not installed",
];

/// Categorize a session failure by its message.
pub fn categorize_session_error(message: &str) -> ErrorCategory {
    let normalized = message.to_ascii_lowercase();
    if PERMANENT_MARKERS.iter().any(|m| normalized.contains(m)) {
        ErrorCategory::Permanent
    } else if TRANSIENT_MARKERS.iter().any(|m| normalized.contains(m)) {
        ErrorCategory::Transient
    } else {
        ErrorCategory::Unknown
    }
}

/// Delay before retry number `attempt` (zero-based): `delay * backoff^attempt`.
pub fn backoff_delay(delay: Duration, backoff: f64, attempt: u32) -> Duration {
    delay.mul_f64(backoff.powi(attempt as i32))
}
