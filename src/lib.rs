//! TextDetector - brightness-adaptive text detection
//!
//! Recognizes text in photographed or scanned images taken under harsh
//! lighting. Bright images are re-recognized after exposure correction and the
//! per-pass results are fused into one deduplicated, reading-ordered list.

pub mod capture;
pub mod channel;
pub mod config;
pub mod detector;
pub mod error;
pub mod vision;

pub use channel::MethodChannel;
pub use detector::{DetectRequest, TextDetector};
pub use error::DetectError;
pub use vision::{Recognizer, TextBlock};
