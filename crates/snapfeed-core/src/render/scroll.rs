//! Progressive scroll-and-snapshot over one rendered page.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::RenderError;

use super::crop::crop_image_in_place;
use super::session::PageSession;
use super::CropConfig;

/// Fraction of the viewport scrolled per step.
const SCROLL_STEP_FRACTION: f64 = 0.8;

/// Minimum advance, as a fraction of the viewport, for a step to produce a
/// screenshot. Smaller advances would be near-duplicates of the previous
/// frame. Heuristic, not derived from any platform property; tests pin it.
const MIN_PROGRESS_FRACTION: f64 = 0.3;

/// Consecutive non-advancing steps tolerated before giving up.
const MAX_NO_PROGRESS: u32 = 2;

/// Hard cap on scroll steps, independent of the screenshot budget.
const MAX_SCROLL_STEPS: u32 = 50;

/// Parameters for one scroll capture.
pub(super) struct ScrollRequest<'a> {
    /// Post ID used in screenshot file names.
    pub post_id: &'a str,
    /// Directory receiving the PNG files.
    pub out_dir: &'a Path,
    /// Upper bound on screenshots, including the initial one.
    pub max_screenshots: u32,
    /// Wait after each scroll step for dynamic content.
    pub settle: Duration,
    /// Optional in-place crop applied to every screenshot.
    pub crop: Option<&'a CropConfig>,
}

/// Scroll through the page from the top, screenshotting as new content
/// comes into view.
///
/// The first screenshot is always taken at the top. The loop then scrolls
/// by 80% of the viewport per step, waits for content to settle, and
/// screenshots only when the page actually advanced by more than 30% of
/// the viewport. Two consecutive non-advances or reaching the bottom end
/// the loop.
pub(super) async fn capture_scrolling_screenshots(
    session: &mut dyn PageSession,
    request: &ScrollRequest<'_>,
) -> Result<Vec<PathBuf>, RenderError> {
    let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S").to_string();
    let viewport = session.viewport_height().await?;
    let mut shots: Vec<PathBuf> = Vec::new();

    take_screenshot(session, request, &stamp, &mut shots).await?;

    let mut last_offset = session.scroll_offset().await?;
    let mut no_progress = 0u32;
    let mut steps = 0u32;

    while (shots.len() as u32) < request.max_screenshots && steps < MAX_SCROLL_STEPS {
        steps += 1;
        let step = (viewport as f64 * SCROLL_STEP_FRACTION) as i64;
        session.scroll_by(step).await?;
        tokio::time::sleep(request.settle).await;

        let offset = session.scroll_offset().await?;
        if offset <= last_offset {
            no_progress += 1;
            if no_progress >= MAX_NO_PROGRESS {
                tracing::debug!(post_id = request.post_id, "cannot scroll further");
                break;
            }
        } else {
            no_progress = 0;
            let progress = offset - last_offset;
            if progress as f64 > viewport as f64 * MIN_PROGRESS_FRACTION {
                take_screenshot(session, request, &stamp, &mut shots).await?;
            } else {
                tracing::debug!(
                    post_id = request.post_id,
                    progress,
                    "skipped screenshot, minimal scroll progress"
                );
            }

            let doc_height = session.document_height().await?;
            if offset >= doc_height - viewport {
                tracing::debug!(post_id = request.post_id, "reached page bottom");
                break;
            }
        }

        last_offset = offset;
    }

    tracing::debug!(
        post_id = request.post_id,
        count = shots.len(),
        "scroll capture finished"
    );
    Ok(shots)
}

async fn take_screenshot(
    session: &mut dyn PageSession,
    request: &ScrollRequest<'_>,
    stamp: &str,
    shots: &mut Vec<PathBuf>,
) -> Result<(), RenderError> {
    let path = request.out_dir.join(format!(
        "{}_{stamp}_page_{:02}.png",
        request.post_id,
        shots.len()
    ));
    session.screenshot(&path).await?;

    if let Some(crop) = request.crop {
        // A failed crop keeps the uncropped original rather than dropping
        // the screenshot.
        if let Err(e) = crop_image_in_place(&path, crop) {
            tracing::warn!(path = %path.display(), error = %e, "crop failed, keeping original");
        }
    }

    shots.push(path);
    Ok(())
}
