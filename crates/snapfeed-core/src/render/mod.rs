//! Browser rendering: navigate, scroll, screenshot, crop.
//!
//! The renderer owns short-lived headless browser sessions: each capture
//! acquires a fresh session, drives it through the scroll-and-snapshot
//! loop, and quits it on every exit path. Session construction failures
//! are categorized and retried with exponential backoff; after the
//! instrumented profile is exhausted a minimal fallback profile gets one
//! attempt. The browser is the pipeline's scarce resource: captures within
//! an account are strictly sequential and a session is never shared.

mod crop;
mod retry;
mod scroll;
pub mod session;

#[cfg(test)]
mod tests;

pub use crop::crop_image_in_place;
pub use retry::{backoff_delay, categorize_session_error, ErrorCategory};
pub use session::{PageSession, SessionFactory, SessionProfile, WebDriverSessionFactory};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::{CaptureConfig, CropSettings};
use crate::error::{ConfigError, RenderError};

/// Validated percentage crop rectangle.
///
/// Construction enforces `0 <= x1 < x2 <= 100` and `0 <= y1 < y2 <= 100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropConfig {
    x1: u32,
    y1: u32,
    x2: u32,
    y2: u32,
}

impl CropConfig {
    /// Validate and build a crop rectangle from integer percents.
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Result<Self, ConfigError> {
        if !(x1 < x2 && x2 <= 100) {
            return Err(ConfigError::InvalidValue {
                field: "crop".to_string(),
                message: format!("invalid X coordinates: x1={x1}, x2={x2}; need 0 <= x1 < x2 <= 100"),
            });
        }
        if !(y1 < y2 && y2 <= 100) {
            return Err(ConfigError::InvalidValue {
                field: "crop".to_string(),
                message: format!("invalid Y coordinates: y1={y1}, y2={y2}; need 0 <= y1 < y2 <= 100"),
            });
        }
        Ok(Self { x1, y1, x2, y2 })
    }

    /// Build from config settings; `None` when cropping is disabled.
    pub fn from_settings(settings: &CropSettings) -> Result<Option<Self>, ConfigError> {
        if !settings.enabled {
            return Ok(None);
        }
        Self::new(settings.x1, settings.y1, settings.x2, settings.y2).map(Some)
    }

    /// Left boundary percent.
    pub fn x1(&self) -> u32 {
        self.x1
    }

    /// Top boundary percent.
    pub fn y1(&self) -> u32 {
        self.y1
    }

    /// Right boundary percent.
    pub fn x2(&self) -> u32 {
        self.x2
    }

    /// Bottom boundary percent.
    pub fn y2(&self) -> u32 {
        self.y2
    }
}

/// Renderer behavior knobs, derived from [`CaptureConfig`].
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Page zoom percentage.
    pub zoom_percent: u32,
    /// Optional crop applied to every screenshot.
    pub crop: Option<CropConfig>,
    /// Session construction attempts per profile.
    pub max_browser_retries: u32,
    /// Base delay between session retries.
    pub retry_delay: Duration,
    /// Backoff multiplier per attempt.
    pub retry_backoff: f64,
    /// Timeout waiting for the article element.
    pub nav_timeout: Duration,
    /// Navigation attempts per capture.
    pub nav_retries: u32,
    /// Dwell after the article element appears.
    pub post_load_dwell: Duration,
    /// Wait after each scroll step.
    pub scroll_settle: Duration,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            zoom_percent: 60,
            crop: None,
            max_browser_retries: 3,
            retry_delay: Duration::from_secs(2),
            retry_backoff: 2.0,
            nav_timeout: Duration::from_secs(10),
            nav_retries: 3,
            post_load_dwell: Duration::from_secs(3),
            scroll_settle: Duration::from_secs(2),
        }
    }
}

impl RendererConfig {
    /// Derive renderer knobs from the capture section of the config file.
    pub fn from_capture_config(capture: &CaptureConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            zoom_percent: capture.zoom_percent,
            crop: CropConfig::from_settings(&capture.crop)?,
            max_browser_retries: capture.max_browser_retries,
            retry_delay: Duration::from_secs_f64(capture.retry_delay_secs),
            retry_backoff: capture.retry_backoff,
            nav_timeout: Duration::from_secs(capture.nav_timeout_secs),
            nav_retries: capture.nav_retries,
            post_load_dwell: Duration::from_secs(capture.post_load_dwell_secs),
            scroll_settle: Duration::from_secs(capture.scroll_settle_secs),
        })
    }
}

/// Result of one successful capture.
#[derive(Debug, Clone)]
pub struct Capture {
    /// Ordered screenshot paths, top of page first.
    pub screenshots: Vec<PathBuf>,
    /// When the capture finished.
    pub timestamp: DateTime<Utc>,
}

/// Port for the capture orchestrator's view of rendering.
#[async_trait::async_trait]
pub trait Renderer: Send + Sync {
    /// Render `url` and return the ordered screenshots, written under
    /// `out_dir`.
    async fn capture(
        &self,
        url: &str,
        post_id: &str,
        out_dir: &Path,
        max_screenshots: u32,
    ) -> Result<Capture, RenderError>;
}

/// Headless-browser renderer over a [`SessionFactory`].
pub struct BrowserRenderer {
    factory: Arc<dyn SessionFactory>,
    config: RendererConfig,
}

impl BrowserRenderer {
    /// Create a renderer.
    pub fn new(factory: Arc<dyn SessionFactory>, config: RendererConfig) -> Self {
        Self { factory, config }
    }

    /// Acquire a session with the instrumented profile, retrying transient
    /// failures with exponential backoff. Permanent failures fail fast.
    /// When the instrumented profile is exhausted, the minimal profile
    /// gets a single attempt.
    async fn acquire_session(&self) -> Result<Box<dyn PageSession>, RenderError> {
        let attempts = self.config.max_browser_retries.max(1);

        for attempt in 0..attempts {
            match self.factory.connect(SessionProfile::Instrumented).await {
                Ok(session) => return Ok(session),
                Err(e) => {
                    match categorize_session_error(&e.to_string()) {
                        ErrorCategory::Permanent => {
                            tracing::warn!(error = %e, "permanent browser failure, not retrying");
                            return Err(e);
                        }
                        ErrorCategory::Transient => {
                            tracing::debug!(
                                attempt = attempt + 1,
                                attempts,
                                error = %e,
                                "transient browser failure"
                            );
                        }
                        ErrorCategory::Unknown => {
                            tracing::warn!(
                                attempt = attempt + 1,
                                attempts,
                                error = %e,
                                "uncategorized browser failure, treating as transient"
                            );
                        }
                    }
                    if attempt + 1 < attempts {
                        let delay = backoff_delay(
                            self.config.retry_delay,
                            self.config.retry_backoff,
                            attempt,
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        tracing::warn!("instrumented profile exhausted, trying minimal fallback");
        self.factory.connect(SessionProfile::Minimal).await
    }

    /// Acquire a session and navigate it to `url`, rebuilding the session
    /// from scratch between navigation attempts.
    async fn establish(&self, url: &str) -> Result<Box<dyn PageSession>, RenderError> {
        let attempts = self.config.nav_retries.max(1);
        let mut last_err: Option<RenderError> = None;

        for attempt in 0..attempts {
            let mut session = self.acquire_session().await?;
            match self.navigate(session.as_mut(), url).await {
                Ok(()) => return Ok(session),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        attempts,
                        url,
                        error = %e,
                        "navigation failed, tearing down session"
                    );
                    close_quietly(session.as_mut()).await;
                    last_err = Some(e);
                    if attempt + 1 < attempts {
                        let delay = self.config.retry_delay.mul_f64(f64::from(attempt + 1));
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| RenderError::Navigation {
            url: url.to_string(),
            message: "no navigation attempts made".to_string(),
        }))
    }

    async fn navigate(&self, session: &mut dyn PageSession, url: &str) -> Result<(), RenderError> {
        session.goto(url).await?;
        session.wait_for_article(self.config.nav_timeout).await?;
        if self.config.zoom_percent != 100 {
            session.apply_zoom(self.config.zoom_percent).await?;
        }
        tokio::time::sleep(self.config.post_load_dwell).await;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Renderer for BrowserRenderer {
    async fn capture(
        &self,
        url: &str,
        post_id: &str,
        out_dir: &Path,
        max_screenshots: u32,
    ) -> Result<Capture, RenderError> {
        let mut session = self.establish(url).await?;

        let request = scroll::ScrollRequest {
            post_id,
            out_dir,
            max_screenshots,
            settle: self.config.scroll_settle,
            crop: self.config.crop.as_ref(),
        };
        let result = scroll::capture_scrolling_screenshots(session.as_mut(), &request).await;

        // The session is quit on every exit path; a failing quit is logged
        // and swallowed.
        close_quietly(session.as_mut()).await;

        let screenshots = result?;
        tracing::info!(post_id, count = screenshots.len(), "capture complete");
        Ok(Capture {
            screenshots,
            timestamp: Utc::now(),
        })
    }
}

async fn close_quietly(session: &mut dyn PageSession) {
    if let Err(e) = session.close().await {
        tracing::warn!(error = %e, "browser session close failed");
    }
}
