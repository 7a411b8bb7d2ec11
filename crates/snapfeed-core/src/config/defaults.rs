//! Default values for configuration fields.
//!
//! Kept in one place so the serde `default = "..."` attributes and the
//! documentation stay in sync.

pub(super) fn zoom_percent() -> u32 {
    60
}

pub(super) fn max_screenshots() -> u32 {
    10
}

pub(super) fn thread_max_screenshots() -> u32 {
    6
}

pub(super) fn max_browser_retries() -> u32 {
    3
}

pub(super) fn retry_delay_secs() -> f64 {
    2.0
}

pub(super) fn retry_backoff() -> f64 {
    2.0
}

pub(super) fn nav_timeout_secs() -> u64 {
    10
}

pub(super) fn nav_retries() -> u32 {
    3
}

pub(super) fn post_load_dwell_secs() -> u64 {
    3
}

pub(super) fn scroll_settle_secs() -> u64 {
    2
}

pub(super) fn webdriver_url() -> String {
    "http://localhost:9515".to_string()
}

pub(super) fn extraction_model() -> String {
    "claude-sonnet-4-5".to_string()
}

pub(super) fn classification_model() -> String {
    "claude-haiku-4-5".to_string()
}

pub(super) fn l1_confidence_threshold() -> f32 {
    0.5
}

pub(super) fn classify_max_attempts() -> u32 {
    3
}

pub(super) fn output_dir() -> String {
    "run_artifacts".to_string()
}

pub(super) fn days_back() -> u32 {
    7
}

pub(super) fn max_items() -> u32 {
    20
}

pub(super) fn account_concurrency() -> usize {
    2
}

pub(super) fn worker_batch_size() -> u32 {
    10
}

pub(super) fn worker_idle_secs() -> u64 {
    1
}

pub(super) fn queue_visibility_secs() -> u64 {
    60
}

pub(super) fn crop_x2() -> u32 {
    100
}

pub(super) fn crop_y2() -> u32 {
    100
}
