//! Recognition engine seam
//!
//! The text recognizer itself is an external collaborator. This module defines
//! what it is given (an upright image plus a [`RecognitionConfig`]) and what it
//! returns (raw observations with normalized, bottom-left-origin boxes).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capture::PixelImage;

/// Recognition accuracy level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionLevel {
    /// Faster, less accurate recognition
    Fast,
    /// Slower, more accurate recognition
    #[default]
    Accurate,
}

impl std::str::FromStr for RecognitionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fast" => Ok(RecognitionLevel::Fast),
            "accurate" => Ok(RecognitionLevel::Accurate),
            other => Err(format!("unknown recognition level '{}'", other)),
        }
    }
}

/// Settings handed to the engine on every pass
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionConfig {
    /// Accuracy level
    pub level: RecognitionLevel,
    /// Ordered language hints; empty means automatic language detection
    pub languages: Vec<String>,
    /// Smallest text to report, as a fraction of image height
    pub min_text_height: f32,
    /// Let the engine apply language-model correction
    pub language_correction: bool,
    /// Engine revision selector
    pub revision: String,
}

impl RecognitionConfig {
    /// True when the engine should pick languages itself
    pub fn auto_detect_language(&self) -> bool {
        self.languages.is_empty()
    }
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            level: RecognitionLevel::Accurate,
            languages: Vec::new(),
            min_text_height: 0.05,
            language_correction: true,
            revision: "latest".to_string(),
        }
    }
}

/// Bounding box in normalized coordinates, origin bottom-left, y up
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedRect {
    /// Clamp into the unit square, absorbing small float overshoot
    ///
    /// Non-finite components collapse to 0.
    pub fn clamped(&self) -> Self {
        let unit = |v: f64| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        let x = unit(self.x);
        let y = unit(self.y);
        Self {
            x,
            y,
            width: unit(self.width).min(1.0 - x),
            height: unit(self.height).min(1.0 - y),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }
}

/// One recognized string with its confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub text: String,
    pub confidence: f32,
}

/// A single engine observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    /// Candidates ranked best-first
    pub candidates: Vec<Candidate>,
    /// Region of the observation
    pub bounding_box: NormalizedRect,
}

impl RawObservation {
    /// Observation with a single candidate
    pub fn new(text: impl Into<String>, confidence: f32, bounding_box: NormalizedRect) -> Self {
        Self {
            candidates: vec![Candidate {
                text: text.into(),
                confidence,
            }],
            bounding_box,
        }
    }

    /// Best candidate, if the engine produced any
    pub fn top_candidate(&self) -> Option<&Candidate> {
        self.candidates.first()
    }
}

/// Failure reported by a [`Recognizer`]
#[derive(Error, Debug)]
pub enum RecognitionError {
    /// The engine could not be invoked at all
    #[error("recognition engine unavailable: {0}")]
    Unavailable(String),
    /// The engine ran and failed on this image
    #[error("recognition failed: {0}")]
    Failed(#[source] anyhow::Error),
}

/// Text recognition engine
///
/// Implementations are called from blocking worker threads, one call per pass,
/// possibly several at once.
pub trait Recognizer: Send + Sync {
    /// Short engine name for logs
    fn name(&self) -> &str;

    /// Recognize text in `image`
    fn recognize(
        &self,
        image: &PixelImage,
        config: &RecognitionConfig,
    ) -> Result<Vec<RawObservation>, RecognitionError>;
}
