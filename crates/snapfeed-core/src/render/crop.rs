//! In-place percentage cropping of screenshots.

use std::path::Path;

use image::GenericImageView;

use crate::error::RenderError;

use super::CropConfig;

/// Crop the PNG at `path` in place.
///
/// Pixel bounds are computed from the image's actual dimensions and the
/// configured percentages, truncated toward zero.
pub fn crop_image_in_place(path: &Path, crop: &CropConfig) -> Result<(), RenderError> {
    let img = image::open(path).map_err(|e| RenderError::Image {
        message: format!("failed to open {}: {e}", path.display()),
    })?;

    let (width, height) = img.dimensions();
    let left = width * crop.x1() / 100;
    let top = height * crop.y1() / 100;
    let right = width * crop.x2() / 100;
    let bottom = height * crop.y2() / 100;

    let cropped = img.crop_imm(left, top, right - left, bottom - top);
    cropped.save(path).map_err(|e| RenderError::Image {
        message: format!("failed to save {}: {e}", path.display()),
    })?;

    tracing::debug!(
        path = %path.display(),
        left, top, right, bottom,
        "cropped screenshot"
    );
    Ok(())
}
