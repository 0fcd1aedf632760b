//! Text detection request handling
//!
//! Ties the vision layer together for one request: load, analyze, plan,
//! recognize every pass, then fuse.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::capture;
use crate::config::{DetectionDefaults, RecognitionSettings};
use crate::error::DetectError;
use crate::vision::{
    brightness, fusion, planner, PassOptions, PreprocessingSelection, RecognitionConfig,
    RecognitionError, RecognitionExecutor, RecognitionLevel, Recognizer, TextBlock,
};

/// One detectText call
#[derive(Debug, Clone, PartialEq)]
pub struct DetectRequest {
    pub image_path: PathBuf,
    pub recognition_level: RecognitionLevel,
    /// Empty means automatic language detection
    pub languages: Vec<String>,
    pub enhance_for_brightness: bool,
    pub preprocessing_level: PreprocessingSelection,
    pub multi_pass: bool,
}

impl DetectRequest {
    /// Request for `image_path` with every option at its built-in default
    pub fn new(image_path: impl Into<PathBuf>) -> Self {
        Self::with_defaults(image_path, &DetectionDefaults::default())
    }

    /// Request for `image_path` with options taken from `defaults`
    pub fn with_defaults(image_path: impl Into<PathBuf>, defaults: &DetectionDefaults) -> Self {
        Self {
            image_path: image_path.into(),
            recognition_level: defaults.recognition_level,
            languages: Vec::new(),
            enhance_for_brightness: defaults.enhance_for_brightness,
            preprocessing_level: defaults.preprocessing_level,
            multi_pass: defaults.multi_pass,
        }
    }

    fn pass_options(&self) -> PassOptions {
        PassOptions {
            enhance_for_brightness: self.enhance_for_brightness,
            preprocessing: self.preprocessing_level,
            multi_pass: self.multi_pass,
        }
    }
}

/// Brightness-adaptive, multi-pass text detector
pub struct TextDetector {
    executor: RecognitionExecutor,
    settings: RecognitionSettings,
}

impl TextDetector {
    /// Create a detector with default engine settings
    pub fn new(recognizer: Arc<dyn Recognizer>) -> Self {
        Self::with_settings(recognizer, RecognitionSettings::default())
    }

    /// Create a detector with custom engine settings
    pub fn with_settings(recognizer: Arc<dyn Recognizer>, settings: RecognitionSettings) -> Self {
        Self {
            executor: RecognitionExecutor::new(recognizer),
            settings,
        }
    }

    fn recognition_config(&self, request: &DetectRequest) -> RecognitionConfig {
        RecognitionConfig {
            level: request.recognition_level,
            languages: request.languages.clone(),
            min_text_height: self.settings.min_text_height,
            language_correction: self.settings.language_correction,
            revision: self.settings.revision.clone(),
        }
    }

    /// Detect text blocks in the image named by `request`
    ///
    /// Either every block is returned or an error is; partial results are never
    /// mixed with a failure.
    pub async fn detect_text(&self, request: &DetectRequest) -> Result<Vec<TextBlock>, DetectError> {
        if request.image_path.as_os_str().is_empty() {
            return Err(DetectError::missing_image_path());
        }

        let start = Instant::now();

        let image = capture::load_image(&request.image_path)
            .map_err(|e| DetectError::image_load(format!("{:#}", e)))?;
        let reference_size = image.dimensions();

        let options = request.pass_options();
        let report = options.needs_brightness().then(|| brightness::analyze(&image));
        if let Some(report) = &report {
            debug!(
                "Brightness: luminance={:.3}, overexposed={}",
                report.luminance, report.overexposed
            );
        }

        let plan = planner::plan(report, &options);
        info!(
            "Running {} recognition pass(es) with '{}': {:?}",
            plan.passes.len(),
            self.executor.recognizer_name(),
            plan.labels()
        );

        let passes = planner::render(&plan, &image);
        let config = self.recognition_config(request);
        let outcomes = self.executor.run_all(passes, &config, reference_size).await;

        let total = outcomes.len();
        let mut detections = Vec::new();
        let mut failures = Vec::new();

        for outcome in outcomes {
            match outcome.result {
                Ok(found) => detections.extend(found),
                Err(RecognitionError::Unavailable(reason)) => {
                    return Err(DetectError::request_failed(reason));
                }
                Err(e) => failures.push((outcome.label, e)),
            }
        }

        // Only total failure reaches the caller
        if failures.len() == total {
            if let Some((_, e)) = failures.into_iter().next() {
                return Err(DetectError::recognition(e.to_string()));
            }
        } else {
            for (label, _) in &failures {
                debug!("Pass '{}' contributed no detections", label);
            }
        }

        let raw_count = detections.len();
        let mut blocks = fusion::merge(detections);
        if !request.multi_pass {
            for block in &mut blocks {
                block.detection_pass = None;
            }
        }

        info!(
            "Detected {} text blocks ({} raw) in {:?}",
            blocks.len(),
            raw_count,
            start.elapsed()
        );

        Ok(blocks)
    }
}
