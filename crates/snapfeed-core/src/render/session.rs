//! Browser session ports and the WebDriver implementation.
//!
//! [`PageSession`] is the renderer's view of one live browser page;
//! [`SessionFactory`] creates sessions for a profile. The production
//! implementation drives chromedriver through fantoccini; tests inject
//! scripted sessions.

use std::path::Path;
use std::time::Duration;

use fantoccini::{ClientBuilder, Locator};

use crate::error::RenderError;

/// Desktop Chrome user agent sent by the instrumented profile.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Browser launch profile.
///
/// The instrumented profile is the normal path; the minimal profile is the
/// bare-defaults fallback attempted once when the instrumented session
/// cannot be created after all retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionProfile {
    /// Full profile: fixed window, UA override, extensions disabled.
    Instrumented,
    /// Bare defaults, no extensions or UA override.
    Minimal,
}

/// One live browser page.
#[async_trait::async_trait]
pub trait PageSession: Send {
    /// Navigate to a URL.
    async fn goto(&mut self, url: &str) -> Result<(), RenderError>;

    /// Wait for the main article element to be present.
    async fn wait_for_article(&mut self, timeout: Duration) -> Result<(), RenderError>;

    /// Apply a page zoom percentage.
    async fn apply_zoom(&mut self, percent: u32) -> Result<(), RenderError>;

    /// Viewport height in CSS pixels.
    async fn viewport_height(&mut self) -> Result<i64, RenderError>;

    /// Full document height in CSS pixels.
    async fn document_height(&mut self) -> Result<i64, RenderError>;

    /// Current vertical scroll offset.
    async fn scroll_offset(&mut self) -> Result<i64, RenderError>;

    /// Scroll down by a pixel amount.
    async fn scroll_by(&mut self, pixels: i64) -> Result<(), RenderError>;

    /// Capture the viewport as a PNG at `path`.
    async fn screenshot(&mut self, path: &Path) -> Result<(), RenderError>;

    /// Quit the browser session. Safe to call more than once.
    async fn close(&mut self) -> Result<(), RenderError>;
}

/// Creates browser sessions.
#[async_trait::async_trait]
pub trait SessionFactory: Send + Sync {
    /// Open a new session with the given profile.
    async fn connect(&self, profile: SessionProfile) -> Result<Box<dyn PageSession>, RenderError>;
}

/// Factory connecting to a WebDriver endpoint (chromedriver).
pub struct WebDriverSessionFactory {
    webdriver_url: String,
}

impl WebDriverSessionFactory {
    /// Create a factory for the given WebDriver endpoint.
    pub fn new(webdriver_url: String) -> Self {
        Self { webdriver_url }
    }

    fn capabilities(profile: SessionProfile) -> serde_json::Map<String, serde_json::Value> {
        let args: Vec<String> = match profile {
            SessionProfile::Instrumented => vec![
                "--headless=new".to_string(),
                "--no-sandbox".to_string(),
                "--disable-dev-shm-usage".to_string(),
                "--disable-gpu".to_string(),
                "--window-size=1920,1080".to_string(),
                "--disable-extensions".to_string(),
                "--disable-plugins".to_string(),
                format!("--user-agent={USER_AGENT}"),
            ],
            SessionProfile::Minimal => vec!["--headless=new".to_string()],
        };

        let mut caps = serde_json::Map::new();
        caps.insert(
            "goog:chromeOptions".to_string(),
            serde_json::json!({ "args": args }),
        );
        caps
    }
}

#[async_trait::async_trait]
impl SessionFactory for WebDriverSessionFactory {
    async fn connect(&self, profile: SessionProfile) -> Result<Box<dyn PageSession>, RenderError> {
        let mut builder = ClientBuilder::rustls().map_err(|e| RenderError::Session {
            message: format!("tls setup failed: {e}"),
        })?;

        let client = builder
            .capabilities(Self::capabilities(profile))
            .connect(&self.webdriver_url)
            .await
            .map_err(|e| RenderError::Session {
                message: e.to_string(),
            })?;

        tracing::debug!(url = %self.webdriver_url, ?profile, "browser session created");
        Ok(Box::new(WebDriverSession {
            client: Some(client),
        }))
    }
}

/// A fantoccini-backed page session.
struct WebDriverSession {
    client: Option<fantoccini::Client>,
}

impl WebDriverSession {
    fn client(&mut self) -> Result<&mut fantoccini::Client, RenderError> {
        self.client.as_mut().ok_or_else(|| RenderError::Session {
            message: "session already closed".to_string(),
        })
    }

    async fn execute_i64(&mut self, script: &str) -> Result<i64, RenderError> {
        let value = self
            .client()?
            .execute(script, vec![])
            .await
            .map_err(|e| RenderError::Script {
                message: e.to_string(),
            })?;
        value
            .as_f64()
            .map(|v| v as i64)
            .ok_or_else(|| RenderError::Script {
                message: format!("script '{script}' returned non-numeric value"),
            })
    }
}

#[async_trait::async_trait]
impl PageSession for WebDriverSession {
    async fn goto(&mut self, url: &str) -> Result<(), RenderError> {
        let target = url.to_string();
        self.client()?
            .goto(url)
            .await
            .map_err(|e| RenderError::Navigation {
                url: target,
                message: e.to_string(),
            })
    }

    async fn wait_for_article(&mut self, timeout: Duration) -> Result<(), RenderError> {
        let current = self
            .client()?
            .current_url()
            .await
            .map(|u| u.to_string())
            .unwrap_or_default();
        self.client()?
            .wait()
            .at_most(timeout)
            .for_element(Locator::Css("article"))
            .await
            .map(|_| ())
            .map_err(|e| RenderError::Navigation {
                url: current,
                message: format!("timed out waiting for article element: {e}"),
            })
    }

    async fn apply_zoom(&mut self, percent: u32) -> Result<(), RenderError> {
        let zoom = f64::from(percent) / 100.0;
        self.client()?
            .execute(&format!("document.body.style.zoom='{zoom}'"), vec![])
            .await
            .map(|_| ())
            .map_err(|e| RenderError::Script {
                message: e.to_string(),
            })
    }

    async fn viewport_height(&mut self) -> Result<i64, RenderError> {
        self.execute_i64("return window.innerHeight").await
    }

    async fn document_height(&mut self) -> Result<i64, RenderError> {
        self.execute_i64("return document.body.scrollHeight").await
    }

    async fn scroll_offset(&mut self) -> Result<i64, RenderError> {
        self.execute_i64("return window.pageYOffset").await
    }

    async fn scroll_by(&mut self, pixels: i64) -> Result<(), RenderError> {
        self.client()?
            .execute(&format!("window.scrollBy(0, {pixels})"), vec![])
            .await
            .map(|_| ())
            .map_err(|e| RenderError::Script {
                message: e.to_string(),
            })
    }

    async fn screenshot(&mut self, path: &Path) -> Result<(), RenderError> {
        let png = self
            .client()?
            .screenshot()
            .await
            .map_err(|e| RenderError::Script {
                message: e.to_string(),
            })?;
        tokio::fs::write(path, png)
            .await
            .map_err(|source| RenderError::Screenshot { source })
    }

    async fn close(&mut self) -> Result<(), RenderError> {
        if let Some(client) = self.client.take() {
            client.close().await.map_err(|e| RenderError::Session {
                message: e.to_string(),
            })?;
        }
        Ok(())
    }
}
