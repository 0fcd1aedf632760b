//! Pixel buffer shared by every stage of a detection request

use image::{Rgba, RgbaImage};
use std::sync::Arc;

/// An upright RGBA pixel buffer
///
/// Immutable once built. Transforms produce a new `PixelImage`; cloning only
/// bumps a reference count so several passes can hold the same original.
#[derive(Debug, Clone)]
pub struct PixelImage {
    buffer: Arc<RgbaImage>,
}

impl PixelImage {
    /// Wrap an RGBA buffer
    pub fn new(buffer: RgbaImage) -> Self {
        Self {
            buffer: Arc::new(buffer),
        }
    }

    /// Build an image from raw RGBA bytes, returning `None` when the length does not match
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        RgbaImage::from_raw(width, height, data).map(Self::new)
    }

    /// Build an image where every pixel has the same color
    pub fn filled(width: u32, height: u32, color: [u8; 4]) -> Self {
        Self::new(RgbaImage::from_pixel(width, height, Rgba(color)))
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// Get image dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    /// True when the image holds no pixels
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Borrow the underlying pixel buffer
    pub fn as_rgba(&self) -> &RgbaImage {
        &self.buffer
    }

    /// Raw RGBA bytes, row-major
    pub fn as_raw(&self) -> &[u8] {
        self.buffer.as_raw()
    }
}

impl PartialEq for PixelImage {
    fn eq(&self, other: &Self) -> bool {
        self.dimensions() == other.dimensions() && self.as_raw() == other.as_raw()
    }
}
