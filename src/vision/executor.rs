//! Concurrent recognition over planned passes
//!
//! Every pass runs on its own blocking worker. Results are gathered at a single
//! join point; a failing pass only affects its own slot.

use futures_util::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use super::ocr::{NormalizedRect, RawObservation, RecognitionConfig, RecognitionError, Recognizer};
use super::planner::{Pass, PassLabel};

/// Bounding box in pixels, origin top-left, y down
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelRect {
    /// Convert a normalized bottom-left box into pixel space of a `width` x `height` image
    pub fn from_normalized(rect: &NormalizedRect, width: u32, height: u32) -> Self {
        let rect = rect.clamped();
        let (w, h) = (width as f64, height as f64);
        Self {
            x: rect.x * w,
            y: (1.0 - rect.y - rect.height) * h,
            width: rect.width * w,
            height: rect.height * h,
        }
    }
}

/// A recognized region tagged with the pass that found it
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub text: String,
    pub confidence: f32,
    pub bounds: PixelRect,
    /// Dimensions of the original image the bounds refer to
    pub image_size: (u32, u32),
    pub pass: PassLabel,
}

/// Result of one pass
#[derive(Debug)]
pub struct PassOutcome {
    pub label: PassLabel,
    pub result: Result<Vec<Detection>, RecognitionError>,
}

/// Runs a recognizer once per pass, concurrently
pub struct RecognitionExecutor {
    recognizer: Arc<dyn Recognizer>,
}

impl RecognitionExecutor {
    pub fn new(recognizer: Arc<dyn Recognizer>) -> Self {
        Self { recognizer }
    }

    pub fn recognizer_name(&self) -> &str {
        self.recognizer.name()
    }

    /// Recognize every pass and wait for all of them
    ///
    /// Boxes are converted with `reference_size`, the original image's
    /// dimensions, never the dimensions of a pass's own buffer.
    pub async fn run_all(
        &self,
        passes: Vec<Pass>,
        config: &RecognitionConfig,
        reference_size: (u32, u32),
    ) -> Vec<PassOutcome> {
        let config = Arc::new(config.clone());

        let tasks = passes.into_iter().map(|pass| {
            let recognizer = Arc::clone(&self.recognizer);
            let config = Arc::clone(&config);
            let label = pass.label;

            let handle = tokio::task::spawn_blocking(move || {
                let start = Instant::now();
                let result = recognizer.recognize(&pass.image, &config);
                (result, start.elapsed())
            });

            async move { (label, handle.await) }
        });

        join_all(tasks)
            .await
            .into_iter()
            .map(|(label, joined)| {
                let result = match joined {
                    Ok((Ok(observations), elapsed)) => {
                        let detections = to_detections(observations, label, reference_size);
                        debug!(
                            "Pass '{}' complete in {:?}: {} detections",
                            label,
                            elapsed,
                            detections.len()
                        );
                        Ok(detections)
                    }
                    Ok((Err(e), elapsed)) => {
                        warn!("Pass '{}' failed after {:?}: {}", label, elapsed, e);
                        Err(e)
                    }
                    Err(e) => {
                        warn!("Pass '{}' did not complete: {}", label, e);
                        Err(RecognitionError::Failed(anyhow::anyhow!(
                            "recognition task aborted: {}",
                            e
                        )))
                    }
                };
                PassOutcome { label, result }
            })
            .collect()
    }
}

/// Keep each observation's top candidate and move it to pixel space
fn to_detections(
    observations: Vec<RawObservation>,
    label: PassLabel,
    (width, height): (u32, u32),
) -> Vec<Detection> {
    observations
        .into_iter()
        .filter_map(|obs| {
            if !obs.bounding_box.is_finite() {
                warn!(
                    "Pass '{}' dropped an observation with a non-finite box {:?}",
                    label, obs.bounding_box
                );
                return None;
            }
            let top = obs.top_candidate()?;
            let bounds = PixelRect::from_normalized(&obs.bounding_box, width, height);
            Some(Detection {
                text: top.text.clone(),
                confidence: top.confidence,
                bounds,
                image_size: (width, height),
                pass: label,
            })
        })
        .collect()
}
