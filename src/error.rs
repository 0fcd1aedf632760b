//! Error types surfaced to callers of the detector

use serde::Serialize;
use thiserror::Error;

/// Caller-visible detection failure
///
/// Every variant maps to a stable wire code via [`DetectError::code`].
#[derive(Error, Debug)]
pub enum DetectError {
    #[error("{message}")]
    InvalidArguments { message: String },
    #[error("{message}")]
    ImageLoad {
        message: String,
        details: Option<String>,
    },
    #[error("{message}")]
    Recognition {
        message: String,
        details: Option<String>,
    },
    #[error("{message}")]
    RequestFailed {
        message: String,
        details: Option<String>,
    },
    #[error("Method not implemented: {method}")]
    NotImplemented { method: String },
}

impl DetectError {
    pub fn missing_image_path() -> Self {
        Self::InvalidArguments {
            message: "Image path is required".to_string(),
        }
    }

    pub fn image_load(details: impl Into<String>) -> Self {
        Self::ImageLoad {
            message: "Failed to load image from path".to_string(),
            details: Some(details.into()),
        }
    }

    pub fn recognition(details: impl Into<String>) -> Self {
        Self::Recognition {
            message: "Text recognition failed".to_string(),
            details: Some(details.into()),
        }
    }

    pub fn request_failed(details: impl Into<String>) -> Self {
        Self::RequestFailed {
            message: "Failed to perform text recognition".to_string(),
            details: Some(details.into()),
        }
    }

    /// Stable code reported to the host
    pub fn code(&self) -> &'static str {
        match self {
            DetectError::InvalidArguments { .. } => "INVALID_ARGUMENTS",
            DetectError::ImageLoad { .. } => "IMAGE_LOAD_ERROR",
            DetectError::Recognition { .. } => "RECOGNITION_ERROR",
            DetectError::RequestFailed { .. } => "REQUEST_FAILED",
            DetectError::NotImplemented { .. } => "NOT_IMPLEMENTED",
        }
    }

    /// Extra diagnostic text, usually the engine's own error message
    pub fn details(&self) -> Option<&str> {
        match self {
            DetectError::ImageLoad { details, .. }
            | DetectError::Recognition { details, .. }
            | DetectError::RequestFailed { details, .. } => details.as_deref(),
            DetectError::InvalidArguments { .. } | DetectError::NotImplemented { .. } => None,
        }
    }

    /// Wire form of the error
    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            code: self.code(),
            message: self.to_string(),
            details: self.details().map(str::to_string),
        }
    }
}

/// Serialized error returned over the host channel
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
