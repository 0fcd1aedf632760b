//! Scene brightness estimation
//!
//! Reduces the image to one average pixel and weights its channels with the
//! Rec. 601 luma coefficients.

use crate::capture::PixelImage;

/// Luminance above which an image counts as overexposed
pub const OVEREXPOSED_LUMINANCE: f32 = 0.75;

/// Luminance reported for images with no pixels
pub const NEUTRAL_LUMINANCE: f32 = 0.5;

/// Result of brightness analysis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrightnessReport {
    /// Average perceptual luminance in [0, 1]
    pub luminance: f32,
    /// True when `luminance` exceeds [`OVEREXPOSED_LUMINANCE`]
    pub overexposed: bool,
}

impl BrightnessReport {
    fn from_luminance(luminance: f32) -> Self {
        Self {
            luminance,
            overexposed: luminance > OVEREXPOSED_LUMINANCE,
        }
    }
}

/// Estimate average luminance and flag overexposure
pub fn analyze(image: &PixelImage) -> BrightnessReport {
    if image.is_empty() {
        return BrightnessReport {
            luminance: NEUTRAL_LUMINANCE,
            overexposed: false,
        };
    }

    let mut sums = [0u64; 3];
    for chunk in image.as_raw().chunks_exact(4) {
        sums[0] += chunk[0] as u64;
        sums[1] += chunk[1] as u64;
        sums[2] += chunk[2] as u64;
    }

    let pixel_count = image.width() as f64 * image.height() as f64;
    let [r, g, b] = sums.map(|s| s as f64 / pixel_count / 255.0);

    // Standard luminance weights
    let luminance = (0.299 * r + 0.587 * g + 0.114 * b).clamp(0.0, 1.0) as f32;

    BrightnessReport::from_luminance(luminance)
}
