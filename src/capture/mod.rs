//! Image Acquisition Layer
//!
//! Decodes an image file into an upright RGBA buffer. EXIF orientation is
//! applied at load time so every later stage works in display coordinates.

pub mod frame;

use anyhow::{Context, Result};
use image::{DynamicImage, ImageDecoder, ImageReader};
use std::path::Path;
use tracing::debug;

pub use frame::PixelImage;

/// Load an image from disk and normalize its orientation
pub fn load_image(path: &Path) -> Result<PixelImage> {
    let reader = ImageReader::open(path)
        .with_context(|| format!("Failed to open image: {:?}", path))?
        .with_guessed_format()
        .with_context(|| format!("Failed to detect image format: {:?}", path))?;

    let mut decoder = reader
        .into_decoder()
        .with_context(|| format!("Failed to create decoder for {:?}", path))?;

    let orientation = decoder
        .orientation()
        .context("Failed to read image orientation")?;

    let mut image = DynamicImage::from_decoder(decoder)
        .with_context(|| format!("Failed to decode image: {:?}", path))?;
    image.apply_orientation(orientation);

    let rgba = image.to_rgba8();
    if rgba.width() == 0 || rgba.height() == 0 {
        anyhow::bail!("Image has no pixels: {:?}", path);
    }

    debug!(
        "Loaded {:?}: {}x{} (orientation {:?})",
        path,
        rgba.width(),
        rgba.height(),
        orientation
    );

    Ok(PixelImage::new(rgba))
}
