//! Recorded recognizer output
//!
//! Serves observations captured from a real engine run, stored as JSON. Used by
//! the CLI when no live engine is linked, and handy for reproducing fusion
//! behavior on a known input.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use super::ocr::{RawObservation, RecognitionConfig, RecognitionError, Recognizer};
use crate::capture::PixelImage;

/// Recognizer that returns the same recorded observations for every pass
pub struct ReplayRecognizer {
    observations: Vec<RawObservation>,
}

impl ReplayRecognizer {
    pub fn new(observations: Vec<RawObservation>) -> Self {
        Self { observations }
    }

    /// Load a JSON array of observations
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read replay file: {:?}", path))?;
        let observations: Vec<RawObservation> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse replay file: {:?}", path))?;

        info!("Loaded {} recorded observations from {:?}", observations.len(), path);
        Ok(Self::new(observations))
    }
}

impl Recognizer for ReplayRecognizer {
    fn name(&self) -> &str {
        "replay"
    }

    fn recognize(
        &self,
        _image: &PixelImage,
        _config: &RecognitionConfig,
    ) -> Result<Vec<RawObservation>, RecognitionError> {
        Ok(self.observations.clone())
    }
}

/// Placeholder used when no engine is configured; every call fails to dispatch
pub struct UnavailableRecognizer;

impl Recognizer for UnavailableRecognizer {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn recognize(
        &self,
        _image: &PixelImage,
        _config: &RecognitionConfig,
    ) -> Result<Vec<RawObservation>, RecognitionError> {
        Err(RecognitionError::Unavailable(
            "no recognition engine configured".to_string(),
        ))
    }
}
