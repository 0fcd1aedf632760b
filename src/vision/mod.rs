//! Vision/OCR Layer
//!
//! Brightness-adaptive text recognition:
//! - brightness analysis and pass planning
//! - preprocessing of bright or washed-out images
//! - concurrent recognition of every planned pass
//! - fusion of per-pass detections into one ordered result

pub mod brightness;
pub mod executor;
pub mod fusion;
pub mod ocr;
pub mod ocr_preprocess;
pub mod planner;
pub mod replay;

pub use brightness::{analyze, BrightnessReport};
pub use executor::{Detection, PassOutcome, PixelRect, RecognitionExecutor};
pub use fusion::{merge, SpatialKey, TextBlock};
pub use ocr::{
    Candidate, NormalizedRect, RawObservation, RecognitionConfig, RecognitionError,
    RecognitionLevel, Recognizer,
};
pub use ocr_preprocess::{ImageTransform, PreprocessingLevel, PreprocessingParameters, PreprocessingPipeline};
pub use planner::{Pass, PassLabel, PassOptions, PassPlan, PassSpec, PreprocessingSelection};
pub use replay::{ReplayRecognizer, UnavailableRecognizer};
