//! Brightness-correcting preprocessing for OCR
//!
//! Bright, washed-out photos lose text contrast. Each preprocessing level maps
//! to a fixed parameter set that is applied through four ordered stages:
//!
//! 1. Exposure, in linear light: each sRGB channel value `v` (in [0, 1]) is
//!    linearized, scaled by `2^ev`, and re-encoded, i.e.
//!    `srgb(linear(v) * 2^ev)`. Dark strokes stay well apart from the paper.
//! 2. Contrast/brightness: `(v - 0.5) * contrast + 0.5 + brightness`.
//! 3. Highlights/shadows: above mid-gray `v + highlights * (v - 0.5)`,
//!    below mid-gray `v + shadows * (0.5 - v)`.
//! 4. Unsharp mask: `v + intensity * (v - gaussian_blur(v, radius))`.
//!
//! All results are clamped to [0, 1]; alpha is never touched. A stage whose
//! primitive fails passes its input through unchanged.

use anyhow::{ensure, Result};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::capture::PixelImage;

/// Shadow lift applied by every level
pub const SHADOW_AMOUNT: f32 = 0.3;
/// Unsharp mask blur radius (gaussian sigma, pixels)
pub const SHARPEN_RADIUS: f32 = 2.5;
/// Unsharp mask strength
pub const SHARPEN_INTENSITY: f32 = 0.5;

/// Named preprocessing intensity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreprocessingLevel {
    None,
    Light,
    Moderate,
    Aggressive,
}

impl PreprocessingLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreprocessingLevel::None => "none",
            PreprocessingLevel::Light => "light",
            PreprocessingLevel::Moderate => "moderate",
            PreprocessingLevel::Aggressive => "aggressive",
        }
    }

    /// Fixed parameter table
    pub fn parameters(&self) -> PreprocessingParameters {
        match self {
            PreprocessingLevel::None => PreprocessingParameters::IDENTITY,
            PreprocessingLevel::Light => PreprocessingParameters {
                exposure_adjust: -0.5,
                contrast: 1.1,
                brightness: -0.05,
                highlight_reduction: -0.3,
            },
            PreprocessingLevel::Moderate => PreprocessingParameters {
                exposure_adjust: -1.0,
                contrast: 1.3,
                brightness: -0.15,
                highlight_reduction: -0.5,
            },
            PreprocessingLevel::Aggressive => PreprocessingParameters {
                exposure_adjust: -1.5,
                contrast: 1.5,
                brightness: -0.25,
                highlight_reduction: -0.8,
            },
        }
    }
}

/// Adjustment strengths for one level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreprocessingParameters {
    /// Exposure change in stops
    pub exposure_adjust: f32,
    /// Contrast multiplier around mid-gray
    pub contrast: f32,
    /// Additive brightness offset
    pub brightness: f32,
    /// Highlight gain; negative compresses highlights toward mid-gray
    pub highlight_reduction: f32,
}

impl PreprocessingParameters {
    pub const IDENTITY: Self = Self {
        exposure_adjust: 0.0,
        contrast: 1.0,
        brightness: 0.0,
        highlight_reduction: 0.0,
    };
}

/// A single image filter stage
pub trait ImageTransform: Send + Sync {
    fn name(&self) -> &'static str;

    /// True when applying the stage would leave every pixel unchanged
    fn is_noop(&self) -> bool {
        false
    }

    fn apply(&self, image: &PixelImage) -> Result<PixelImage>;
}

/// Exposure adjustment in photographic stops
#[derive(Debug, Clone, Copy)]
pub struct ExposureAdjust {
    pub stops: f32,
}

impl ImageTransform for ExposureAdjust {
    fn name(&self) -> &'static str {
        "exposure"
    }

    fn is_noop(&self) -> bool {
        self.stops.abs() < f32::EPSILON
    }

    fn apply(&self, image: &PixelImage) -> Result<PixelImage> {
        ensure!(self.stops.is_finite(), "exposure must be finite, got {}", self.stops);
        let gain = 2f32.powf(self.stops);
        Ok(map_channels(image, |v| linear_to_srgb(srgb_to_linear(v) * gain)))
    }
}

/// Contrast around mid-gray followed by a brightness offset
#[derive(Debug, Clone, Copy)]
pub struct ContrastBrightness {
    pub contrast: f32,
    pub brightness: f32,
}

impl ImageTransform for ContrastBrightness {
    fn name(&self) -> &'static str {
        "contrast"
    }

    fn is_noop(&self) -> bool {
        (self.contrast - 1.0).abs() < f32::EPSILON && self.brightness.abs() < f32::EPSILON
    }

    fn apply(&self, image: &PixelImage) -> Result<PixelImage> {
        ensure!(
            self.contrast.is_finite() && self.brightness.is_finite(),
            "contrast/brightness must be finite"
        );
        let (contrast, brightness) = (self.contrast, self.brightness);
        Ok(map_channels(image, |v| (v - 0.5) * contrast + 0.5 + brightness))
    }
}

/// Highlight compression and shadow lift
#[derive(Debug, Clone, Copy)]
pub struct HighlightShadow {
    pub highlights: f32,
    pub shadows: f32,
}

impl ImageTransform for HighlightShadow {
    fn name(&self) -> &'static str {
        "highlight_shadow"
    }

    fn is_noop(&self) -> bool {
        self.highlights.abs() < f32::EPSILON && self.shadows.abs() < f32::EPSILON
    }

    fn apply(&self, image: &PixelImage) -> Result<PixelImage> {
        ensure!(
            self.highlights.is_finite() && self.shadows.is_finite(),
            "highlight/shadow amounts must be finite"
        );
        let (highlights, shadows) = (self.highlights, self.shadows);
        Ok(map_channels(image, |v| {
            if v > 0.5 {
                v + highlights * (v - 0.5)
            } else {
                v + shadows * (0.5 - v)
            }
        }))
    }
}

/// Unsharp mask sharpening
#[derive(Debug, Clone, Copy)]
pub struct UnsharpMask {
    pub radius: f32,
    pub intensity: f32,
}

impl ImageTransform for UnsharpMask {
    fn name(&self) -> &'static str {
        "sharpen"
    }

    fn is_noop(&self) -> bool {
        self.intensity.abs() < f32::EPSILON
    }

    fn apply(&self, image: &PixelImage) -> Result<PixelImage> {
        // gaussian_blur_f32 panics on a non-positive sigma
        ensure!(
            self.radius.is_finite() && self.radius > 0.0,
            "sharpen radius must be positive, got {}",
            self.radius
        );
        ensure!(self.intensity.is_finite(), "sharpen intensity must be finite");

        let blurred = imageproc::filter::gaussian_blur_f32(image.as_rgba(), self.radius);
        let mut result = image.as_rgba().clone();

        for (chunk, soft) in result.chunks_exact_mut(4).zip(blurred.chunks_exact(4)) {
            for c in 0..3 {
                let val = chunk[c] as f32;
                let sharpened = val + self.intensity * (val - soft[c] as f32);
                chunk[c] = sharpened.round().clamp(0.0, 255.0) as u8;
            }
            // Alpha unchanged
        }

        Ok(PixelImage::new(result))
    }
}

/// Ordered chain of image transforms
pub struct PreprocessingPipeline {
    stages: Vec<Box<dyn ImageTransform>>,
}

impl PreprocessingPipeline {
    /// Build a pipeline from explicit stages
    pub fn with_stages(stages: Vec<Box<dyn ImageTransform>>) -> Self {
        Self { stages }
    }

    /// Standard four-stage pipeline for a level; `None` yields an empty pipeline
    pub fn for_level(level: PreprocessingLevel) -> Self {
        if level == PreprocessingLevel::None {
            return Self::with_stages(vec![]);
        }

        let params = level.parameters();
        Self::with_stages(vec![
            Box::new(ExposureAdjust {
                stops: params.exposure_adjust,
            }),
            Box::new(ContrastBrightness {
                contrast: params.contrast,
                brightness: params.brightness,
            }),
            Box::new(HighlightShadow {
                highlights: params.highlight_reduction,
                shadows: SHADOW_AMOUNT,
            }),
            // Runs last to recover edges softened by the tone stages
            Box::new(UnsharpMask {
                radius: SHARPEN_RADIUS,
                intensity: SHARPEN_INTENSITY,
            }),
        ])
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage in order, returning a new image of the same size
    pub fn run(&self, image: &PixelImage) -> PixelImage {
        let mut current = image.clone();

        for stage in &self.stages {
            if stage.is_noop() {
                continue;
            }
            match stage.apply(&current) {
                Ok(next) if next.dimensions() == current.dimensions() => current = next,
                Ok(next) => {
                    warn!(
                        "Preprocessing stage '{}' changed size {:?} -> {:?}, skipping it",
                        stage.name(),
                        current.dimensions(),
                        next.dimensions()
                    );
                }
                Err(e) => {
                    warn!("Preprocessing stage '{}' unavailable, passing through: {:#}", stage.name(), e);
                }
            }
        }

        current
    }
}

/// Apply the standard pipeline for `level` to `image`
pub fn apply(image: &PixelImage, level: PreprocessingLevel) -> PixelImage {
    let params = level.parameters();
    debug!(
        "OCR preprocessing level={}: exposure={}, contrast={}, brightness={}, highlights={}",
        level.as_str(),
        params.exposure_adjust,
        params.contrast,
        params.brightness,
        params.highlight_reduction
    );
    PreprocessingPipeline::for_level(level).run(image)
}

/// sRGB transfer function, encoded to linear
fn srgb_to_linear(v: f32) -> f32 {
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(v: f32) -> f32 {
    if v <= 0.003_130_8 {
        v * 12.92
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    }
}

/// Map every RGB channel through `f` in normalized [0, 1] space
fn map_channels(image: &PixelImage, f: impl Fn(f32) -> f32) -> PixelImage {
    let mut result: RgbaImage = image.as_rgba().clone();
    for chunk in result.chunks_exact_mut(4) {
        for value in chunk.iter_mut().take(3) {
            let adjusted = f(*value as f32 / 255.0).clamp(0.0, 1.0);
            *value = (adjusted * 255.0).round() as u8;
        }
        // Alpha channel unchanged
    }
    PixelImage::new(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::brightness;

    struct Broken;

    impl ImageTransform for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn apply(&self, _image: &PixelImage) -> Result<PixelImage> {
            anyhow::bail!("primitive missing")
        }
    }

    struct Invert;

    impl ImageTransform for Invert {
        fn name(&self) -> &'static str {
            "invert"
        }

        fn apply(&self, image: &PixelImage) -> Result<PixelImage> {
            Ok(map_channels(image, |v| 1.0 - v))
        }
    }

    fn gradient(width: u32, height: u32) -> PixelImage {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                let v = ((x * 255) / width.max(1)) as u8;
                data.extend_from_slice(&[v, v / 2, ((y * 40) % 256) as u8, 200]);
            }
        }
        PixelImage::from_raw(width, height, data).unwrap()
    }

    #[test]
    fn test_parameter_table() {
        let light = PreprocessingLevel::Light.parameters();
        assert_eq!(light.exposure_adjust, -0.5);
        assert_eq!(light.contrast, 1.1);
        assert_eq!(light.brightness, -0.05);
        assert_eq!(light.highlight_reduction, -0.3);

        let moderate = PreprocessingLevel::Moderate.parameters();
        assert_eq!(moderate.exposure_adjust, -1.0);
        assert_eq!(moderate.contrast, 1.3);
        assert_eq!(moderate.brightness, -0.15);
        assert_eq!(moderate.highlight_reduction, -0.5);

        let aggressive = PreprocessingLevel::Aggressive.parameters();
        assert_eq!(aggressive.exposure_adjust, -1.5);
        assert_eq!(aggressive.contrast, 1.5);
        assert_eq!(aggressive.brightness, -0.25);
        assert_eq!(aggressive.highlight_reduction, -0.8);
    }

    #[test]
    fn test_none_level_is_identity() {
        let image = gradient(16, 8);
        let result = apply(&image, PreprocessingLevel::None);
        assert_eq!(result, image);
    }

    #[test]
    fn test_identity_stages_leave_data_unchanged() {
        let image = gradient(16, 8);
        let params = PreprocessingParameters::IDENTITY;
        let pipeline = PreprocessingPipeline::with_stages(vec![
            Box::new(ExposureAdjust {
                stops: params.exposure_adjust,
            }),
            Box::new(ContrastBrightness {
                contrast: params.contrast,
                brightness: params.brightness,
            }),
            Box::new(HighlightShadow {
                highlights: params.highlight_reduction,
                shadows: 0.0,
            }),
            Box::new(UnsharpMask {
                radius: SHARPEN_RADIUS,
                intensity: 0.0,
            }),
        ]);
        assert_eq!(pipeline.run(&image), image);
    }

    #[test]
    fn test_stage_order() {
        let pipeline = PreprocessingPipeline::for_level(PreprocessingLevel::Moderate);
        assert_eq!(
            pipeline.stage_names(),
            vec!["exposure", "contrast", "highlight_shadow", "sharpen"]
        );
        assert!(PreprocessingPipeline::for_level(PreprocessingLevel::None)
            .stage_names()
            .is_empty());
    }

    #[test]
    fn test_preserves_dimensions_and_input() {
        let image = gradient(20, 10);
        let before = image.as_raw().to_vec();
        let result = apply(&image, PreprocessingLevel::Aggressive);
        assert_eq!(result.dimensions(), (20, 10));
        assert_eq!(image.as_raw(), before.as_slice());
    }

    #[test]
    fn test_deterministic() {
        let image = gradient(12, 12);
        let a = apply(&image, PreprocessingLevel::Light);
        let b = apply(&image, PreprocessingLevel::Light);
        assert_eq!(a, b);
    }

    #[test]
    fn test_levels_darken_bright_image() {
        let image = PixelImage::filled(16, 16, [235, 235, 235, 255]);
        let original = brightness::analyze(&image).luminance;

        let light = brightness::analyze(&apply(&image, PreprocessingLevel::Light)).luminance;
        let moderate = brightness::analyze(&apply(&image, PreprocessingLevel::Moderate)).luminance;
        let aggressive =
            brightness::analyze(&apply(&image, PreprocessingLevel::Aggressive)).luminance;

        assert!(light < original);
        assert!(moderate < light);
        assert!(aggressive < moderate);
    }

    #[test]
    fn test_alpha_untouched() {
        let image = gradient(10, 10);
        let result = apply(&image, PreprocessingLevel::Aggressive);
        for chunk in result.as_raw().chunks_exact(4) {
            assert_eq!(chunk[3], 200);
        }
    }

    #[test]
    fn test_exposure_halves_light_one_stop() {
        let image = PixelImage::filled(1, 1, [255, 100, 0, 255]);
        let result = ExposureAdjust { stops: -1.0 }.apply(&image).unwrap();
        let px = result.as_raw();
        // linear 1.0 -> 0.5 re-encodes to about 0.735
        assert!((187..=188).contains(&px[0]));
        assert!(px[1] < 100 && px[1] > 50);
        assert_eq!(px[2], 0);
        assert_eq!(px[3], 255);

        let back = srgb_to_linear(px[1] as f32 / 255.0) / srgb_to_linear(100.0 / 255.0);
        assert!((back - 0.5).abs() < 0.02);
    }

    #[test]
    fn test_transfer_functions_invert() {
        for v in [0.0, 0.02, 0.2, 0.5, 0.9, 1.0] {
            assert!((linear_to_srgb(srgb_to_linear(v)) - v).abs() < 1e-5);
        }
    }

    #[test]
    fn test_levels_keep_text_separated_on_bright_paper() {
        // Dark column of text on near-white paper
        let mut data = Vec::new();
        for _y in 0..20 {
            for x in 0..40 {
                let v = if (15..25).contains(&x) { 90 } else { 240 };
                data.extend_from_slice(&[v, v, v, 255]);
            }
        }
        let image = PixelImage::from_raw(40, 20, data).unwrap();

        for level in [
            PreprocessingLevel::Light,
            PreprocessingLevel::Moderate,
            PreprocessingLevel::Aggressive,
        ] {
            let result = apply(&image, level);
            let paper = result.as_rgba().get_pixel(2, 10)[0] as i32;
            let text = result.as_rgba().get_pixel(20, 10)[0] as i32;
            assert!(
                paper - text >= 20,
                "{}: paper {} text {}",
                level.as_str(),
                paper,
                text
            );
        }
    }

    #[test]
    fn test_contrast_around_midpoint() {
        let image = PixelImage::filled(1, 1, [64, 128, 255, 255]);
        let result = ContrastBrightness {
            contrast: 2.0,
            brightness: 0.0,
        }
        .apply(&image)
        .unwrap();
        let px = result.as_raw();
        // 64/255 = 0.251 -> (0.251 - 0.5) * 2 + 0.5 = 0.002
        assert!(px[0] <= 1);
        // 128 sits just above mid-gray
        assert!((128..=129).contains(&px[1]));
        assert_eq!(px[2], 255);
        assert_eq!(px[3], 255);
    }

    #[test]
    fn test_highlight_shadow_compresses_toward_mid() {
        let image = PixelImage::filled(1, 1, [255, 0, 128, 255]);
        let result = HighlightShadow {
            highlights: -0.5,
            shadows: 0.3,
        }
        .apply(&image)
        .unwrap();
        let px = result.as_raw();
        assert!(px[0] < 255);
        assert!(px[1] > 0);
    }

    #[test]
    fn test_sharpen_enhances_edge() {
        let mut data = Vec::new();
        for _y in 0..8 {
            for x in 0..8 {
                let v = if x < 4 { 60 } else { 190 };
                data.extend_from_slice(&[v, v, v, 255]);
            }
        }
        let image = PixelImage::from_raw(8, 8, data).unwrap();
        let result = UnsharpMask {
            radius: 1.0,
            intensity: 1.0,
        }
        .apply(&image)
        .unwrap();

        let px = |x: u32, y: u32| result.as_rgba().get_pixel(x, y)[0];
        assert!(px(3, 4) < 60);
        assert!(px(4, 4) > 190);
    }

    #[test]
    fn test_failing_stage_passes_through() {
        let image = gradient(8, 8);
        let pipeline = PreprocessingPipeline::with_stages(vec![Box::new(Broken)]);
        assert_eq!(pipeline.run(&image), image);

        // Later stages still see the untouched input
        let pipeline = PreprocessingPipeline::with_stages(vec![Box::new(Broken), Box::new(Invert)]);
        let result = pipeline.run(&image);
        assert_eq!(result.as_raw()[0], 255 - image.as_raw()[0]);
    }

    #[test]
    fn test_invalid_sharpen_radius_passes_through() {
        let image = gradient(8, 8);
        let pipeline = PreprocessingPipeline::with_stages(vec![Box::new(UnsharpMask {
            radius: 0.0,
            intensity: 0.5,
        })]);
        assert_eq!(pipeline.run(&image), image);
    }
}
