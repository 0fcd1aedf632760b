//! Host method channel
//!
//! The host sends a method name and a JSON argument map and gets back either a
//! JSON array of text blocks or an error payload with a stable code.

use serde_json::{Map, Value};
use tracing::debug;

use crate::config::DetectionDefaults;
use crate::detector::{DetectRequest, TextDetector};
use crate::error::DetectError;
use crate::vision::{PreprocessingSelection, RecognitionLevel};

/// Method name for text detection
pub const DETECT_TEXT: &str = "detectText";

/// Dispatches host calls to a [`TextDetector`]
pub struct MethodChannel {
    detector: TextDetector,
    defaults: DetectionDefaults,
}

impl MethodChannel {
    pub fn new(detector: TextDetector, defaults: DetectionDefaults) -> Self {
        Self { detector, defaults }
    }

    /// Handle one call
    pub async fn handle_call(&self, method: &str, arguments: &Value) -> Result<Value, DetectError> {
        debug!("Channel call: {}", method);
        match method {
            DETECT_TEXT => {
                let request = parse_detect_request(arguments, &self.defaults)?;
                let blocks = self.detector.detect_text(&request).await?;
                serde_json::to_value(blocks)
                    .map_err(|e| DetectError::request_failed(format!("Failed to encode result: {}", e)))
            }
            other => Err(DetectError::NotImplemented {
                method: other.to_string(),
            }),
        }
    }

    /// Handle one call and flatten the outcome into a single JSON response
    pub async fn respond(&self, method: &str, arguments: &Value) -> Value {
        match self.handle_call(method, arguments).await {
            Ok(result) => serde_json::json!({ "result": result }),
            Err(e) => serde_json::json!({ "error": e.to_payload() }),
        }
    }
}

/// Build a request from a detectText argument map
///
/// Only `imagePath` is required. Optional arguments of the wrong type count as
/// absent, and any recognition level other than `"fast"` means accurate.
pub fn parse_detect_request(
    arguments: &Value,
    defaults: &DetectionDefaults,
) -> Result<DetectRequest, DetectError> {
    let args: &Map<String, Value> = arguments
        .as_object()
        .ok_or_else(DetectError::missing_image_path)?;

    let image_path = args
        .get("imagePath")
        .and_then(Value::as_str)
        .filter(|p| !p.is_empty())
        .ok_or_else(DetectError::missing_image_path)?;

    let mut request = DetectRequest::with_defaults(image_path, defaults);

    if let Some(level) = args.get("recognitionLevel").and_then(Value::as_str) {
        request.recognition_level = if level == "fast" {
            RecognitionLevel::Fast
        } else {
            RecognitionLevel::Accurate
        };
    }

    if let Some(languages) = args.get("languages").and_then(Value::as_array) {
        request.languages = languages
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
    }

    if let Some(enhance) = args.get("enhanceForBrightness").and_then(Value::as_bool) {
        request.enhance_for_brightness = enhance;
    }

    if let Some(level) = args
        .get("preprocessingLevel")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<PreprocessingSelection>().ok())
    {
        request.preprocessing_level = level;
    }

    if let Some(multi_pass) = args.get("multiPass").and_then(Value::as_bool) {
        request.multi_pass = multi_pass;
    }

    Ok(request)
}
