use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::session::{PageSession, SessionFactory, SessionProfile};
use super::*;
use crate::error::RenderError;

/// Shared counters recorded by the scripted factory and its sessions.
#[derive(Debug, Default)]
struct Telemetry {
    instrumented_connects: usize,
    minimal_connects: usize,
    scroll_steps: usize,
    screenshots: usize,
    closes: usize,
}

/// Simulated page geometry and scroll behavior.
#[derive(Debug, Clone, Copy)]
struct PageSpec {
    viewport: i64,
    doc_height: i64,
    /// Offset gained per scroll step (clamped at the page bottom).
    advance_per_scroll: i64,
}

impl Default for PageSpec {
    fn default() -> Self {
        Self {
            viewport: 1000,
            doc_height: 10_000,
            advance_per_scroll: 800,
        }
    }
}

/// Factory whose connect outcomes are scripted; exhausted scripts succeed.
struct ScriptedFactory {
    connect_failures: Mutex<VecDeque<String>>,
    nav_failures: Arc<Mutex<VecDeque<String>>>,
    spec: PageSpec,
    telemetry: Arc<Mutex<Telemetry>>,
}

impl ScriptedFactory {
    fn new(spec: PageSpec) -> Arc<Self> {
        Arc::new(Self {
            connect_failures: Mutex::new(VecDeque::new()),
            nav_failures: Arc::new(Mutex::new(VecDeque::new())),
            spec,
            telemetry: Arc::new(Mutex::new(Telemetry::default())),
        })
    }

    fn fail_connects(self: &Arc<Self>, messages: &[&str]) -> Arc<Self> {
        let mut queue = self.connect_failures.lock().unwrap();
        queue.extend(messages.iter().map(ToString::to_string));
        drop(queue);
        self.clone()
    }

    fn fail_navigations(self: &Arc<Self>, messages: &[&str]) -> Arc<Self> {
        let mut queue = self.nav_failures.lock().unwrap();
        queue.extend(messages.iter().map(ToString::to_string));
        drop(queue);
        self.clone()
    }

    fn telemetry(&self) -> Telemetry {
        let t = self.telemetry.lock().unwrap();
        Telemetry {
            instrumented_connects: t.instrumented_connects,
            minimal_connects: t.minimal_connects,
            scroll_steps: t.scroll_steps,
            screenshots: t.screenshots,
            closes: t.closes,
        }
    }
}

#[async_trait::async_trait]
impl SessionFactory for ScriptedFactory {
    async fn connect(&self, profile: SessionProfile) -> Result<Box<dyn PageSession>, RenderError> {
        {
            let mut t = self.telemetry.lock().unwrap();
            match profile {
                SessionProfile::Instrumented => t.instrumented_connects += 1,
                SessionProfile::Minimal => t.minimal_connects += 1,
            }
        }
        if let Some(message) = self.connect_failures.lock().unwrap().pop_front() {
            return Err(RenderError::Session { message });
        }
        Ok(Box::new(ScriptedSession {
            spec: self.spec,
            offset: 0,
            nav_failures: self.nav_failures.clone(),
            telemetry: self.telemetry.clone(),
        }))
    }
}

struct ScriptedSession {
    spec: PageSpec,
    offset: i64,
    nav_failures: Arc<Mutex<VecDeque<String>>>,
    telemetry: Arc<Mutex<Telemetry>>,
}

#[async_trait::async_trait]
impl PageSession for ScriptedSession {
    async fn goto(&mut self, _url: &str) -> Result<(), RenderError> {
        Ok(())
    }

    async fn wait_for_article(&mut self, _timeout: Duration) -> Result<(), RenderError> {
        if let Some(message) = self.nav_failures.lock().unwrap().pop_front() {
            return Err(RenderError::Navigation {
                url: "about:blank".to_string(),
                message,
            });
        }
        Ok(())
    }

    async fn apply_zoom(&mut self, _percent: u32) -> Result<(), RenderError> {
        Ok(())
    }

    async fn viewport_height(&mut self) -> Result<i64, RenderError> {
        Ok(self.spec.viewport)
    }

    async fn document_height(&mut self) -> Result<i64, RenderError> {
        Ok(self.spec.doc_height)
    }

    async fn scroll_offset(&mut self) -> Result<i64, RenderError> {
        Ok(self.offset)
    }

    async fn scroll_by(&mut self, _pixels: i64) -> Result<(), RenderError> {
        self.telemetry.lock().unwrap().scroll_steps += 1;
        let bottom = (self.spec.doc_height - self.spec.viewport).max(0);
        self.offset = (self.offset + self.spec.advance_per_scroll).min(bottom);
        Ok(())
    }

    async fn screenshot(&mut self, path: &Path) -> Result<(), RenderError> {
        tokio::fs::write(path, b"png")
            .await
            .map_err(|source| RenderError::Screenshot { source })?;
        self.telemetry.lock().unwrap().screenshots += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), RenderError> {
        self.telemetry.lock().unwrap().closes += 1;
        Ok(())
    }
}

fn fast_config() -> RendererConfig {
    RendererConfig {
        zoom_percent: 60,
        crop: None,
        max_browser_retries: 3,
        retry_delay: Duration::from_secs(2),
        retry_backoff: 2.0,
        nav_timeout: Duration::from_secs(10),
        nav_retries: 3,
        post_load_dwell: Duration::ZERO,
        scroll_settle: Duration::ZERO,
    }
}

#[tokio::test(start_paused = true)]
async fn transient_failures_retry_then_fall_back_to_minimal() {
    let factory = ScriptedFactory::new(PageSpec::default()).fail_connects(&[
        "connection timeout",
        "chromedriver session not created",
        "webdriver temporarily unavailable",
    ]);
    let renderer = BrowserRenderer::new(factory.clone(), fast_config());

    let dir = tempfile::tempdir().unwrap();
    let capture = renderer
        .capture("https://twitter.com/u/status/1", "1", dir.path(), 10)
        .await
        .expect("fallback session succeeds");

    let t = factory.telemetry();
    assert_eq!(t.instrumented_connects, 3);
    assert_eq!(t.minimal_connects, 1);
    assert!(!capture.screenshots.is_empty());
}

#[tokio::test]
async fn permanent_failure_fails_fast_without_fallback() {
    let factory =
        ScriptedFactory::new(PageSpec::default()).fail_connects(&["chrome not found"]);
    let renderer = BrowserRenderer::new(factory.clone(), fast_config());

    let dir = tempfile::tempdir().unwrap();
    let err = renderer
        .capture("https://twitter.com/u/status/1", "1", dir.path(), 10)
        .await
        .unwrap_err();

    assert!(matches!(err, RenderError::Session { .. }));
    let t = factory.telemetry();
    assert_eq!(t.instrumented_connects, 1);
    assert_eq!(t.minimal_connects, 0);
}

#[tokio::test(start_paused = true)]
async fn backoff_sleeps_between_session_attempts() {
    let factory = ScriptedFactory::new(PageSpec {
        viewport: 1000,
        doc_height: 1000,
        advance_per_scroll: 0,
    })
    .fail_connects(&["connection timeout", "connection timeout"]);
    let renderer = BrowserRenderer::new(factory.clone(), fast_config());

    let dir = tempfile::tempdir().unwrap();
    let started = tokio::time::Instant::now();
    let capture = renderer
        .capture("https://twitter.com/u/status/1", "1", dir.path(), 10)
        .await
        .expect("third attempt succeeds");

    // Two transient failures: sleeps of d and d*b (2s + 4s), nothing after
    // the successful attempt. Dwell and settle are zero in this config.
    assert_eq!(started.elapsed(), Duration::from_secs(6));
    let t = factory.telemetry();
    assert_eq!(t.instrumented_connects, 3);
    assert_eq!(t.minimal_connects, 0);
    assert_eq!(capture.screenshots.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn non_advancing_page_stops_after_two_steps_with_one_screenshot() {
    let factory = ScriptedFactory::new(PageSpec {
        viewport: 1000,
        doc_height: 5000,
        advance_per_scroll: 0,
    });
    let renderer = BrowserRenderer::new(factory.clone(), fast_config());

    let dir = tempfile::tempdir().unwrap();
    let capture = renderer
        .capture("https://twitter.com/u/status/1", "1", dir.path(), 10)
        .await
        .expect("capture");

    assert_eq!(capture.screenshots.len(), 1);
    let t = factory.telemetry();
    assert_eq!(t.scroll_steps, 2);
    assert_eq!(t.screenshots, 1);
}

#[tokio::test(start_paused = true)]
async fn small_advances_suppress_extra_screenshots() {
    // 10% of the viewport per step, well under the 30% threshold.
    let factory = ScriptedFactory::new(PageSpec {
        viewport: 1000,
        doc_height: 2000,
        advance_per_scroll: 100,
    });
    let renderer = BrowserRenderer::new(factory.clone(), fast_config());

    let dir = tempfile::tempdir().unwrap();
    let capture = renderer
        .capture("https://twitter.com/u/status/1", "1", dir.path(), 10)
        .await
        .expect("capture");

    assert_eq!(capture.screenshots.len(), 1, "only the top-of-page shot");
}

#[tokio::test(start_paused = true)]
async fn full_page_scroll_captures_until_bottom() {
    let factory = ScriptedFactory::new(PageSpec {
        viewport: 1000,
        doc_height: 4000,
        advance_per_scroll: 800,
    });
    let renderer = BrowserRenderer::new(factory.clone(), fast_config());

    let dir = tempfile::tempdir().unwrap();
    let capture = renderer
        .capture("https://twitter.com/u/status/42", "42", dir.path(), 10)
        .await
        .expect("capture");

    // Top shot plus shots at offsets 800/1600/2400/3000 (bottom), each an
    // 80%-of-viewport advance except the final clamped one (600 > 30%).
    assert_eq!(capture.screenshots.len(), 5);
    for (i, path) in capture.screenshots.iter().enumerate() {
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("42_"));
        assert!(name.ends_with(&format!("page_{i:02}.png")));
    }
}

#[tokio::test(start_paused = true)]
async fn screenshot_budget_caps_the_loop() {
    let factory = ScriptedFactory::new(PageSpec {
        viewport: 1000,
        doc_height: 100_000,
        advance_per_scroll: 800,
    });
    let renderer = BrowserRenderer::new(factory.clone(), fast_config());

    let dir = tempfile::tempdir().unwrap();
    let capture = renderer
        .capture("https://twitter.com/u/status/1", "1", dir.path(), 3)
        .await
        .expect("capture");

    assert_eq!(capture.screenshots.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn navigation_timeout_rebuilds_session() {
    let factory = ScriptedFactory::new(PageSpec::default())
        .fail_navigations(&["timed out waiting for article element"]);
    let renderer = BrowserRenderer::new(factory.clone(), fast_config());

    let dir = tempfile::tempdir().unwrap();
    renderer
        .capture("https://twitter.com/u/status/1", "1", dir.path(), 10)
        .await
        .expect("second navigation succeeds");

    let t = factory.telemetry();
    assert_eq!(t.instrumented_connects, 2, "session rebuilt after nav failure");
    assert!(t.closes >= 2, "both sessions closed");
}

#[tokio::test(start_paused = true)]
async fn session_closed_after_successful_capture() {
    let factory = ScriptedFactory::new(PageSpec::default());
    let renderer = BrowserRenderer::new(factory.clone(), fast_config());

    let dir = tempfile::tempdir().unwrap();
    renderer
        .capture("https://twitter.com/u/status/1", "1", dir.path(), 10)
        .await
        .expect("capture");

    assert_eq!(factory.telemetry().closes, 1);
}

#[test]
fn crop_config_rejects_out_of_order_bounds() {
    assert!(CropConfig::new(31, 0, 63, 98).is_ok());
    assert!(CropConfig::new(63, 0, 31, 98).is_err());
    assert!(CropConfig::new(0, 50, 100, 50).is_err());
    assert!(CropConfig::new(0, 0, 101, 100).is_err());
    assert!(CropConfig::new(0, 0, 100, 101).is_err());
    assert!(CropConfig::new(0, 0, 0, 100).is_err());
}

#[test]
fn crop_config_from_disabled_settings_is_none() {
    let settings = crate::config::CropSettings {
        enabled: false,
        x1: 90,
        y1: 90,
        x2: 10,
        y2: 10,
    };
    assert!(CropConfig::from_settings(&settings).unwrap().is_none());
}
