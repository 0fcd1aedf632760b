//! Cross-pass result fusion
//!
//! Detections from every pass are bucketed by a coarse spatial key. Each bucket
//! keeps its most confident detection, and the survivors are sorted into
//! reading order (top to bottom, left to right).

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

use super::executor::{Detection, PixelRect};
use super::planner::PassLabel;

/// Quantization step for spatial buckets, in pixels
pub const BUCKET_QUANTUM: f64 = 10.0;
/// Maximum vertical distance for two blocks to count as the same line
pub const LINE_TOLERANCE: f64 = 10.0;

/// Coarse bounding-box identity used to match detections across passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpatialKey(i64, i64, i64, i64);

impl SpatialKey {
    pub fn from_rect(rect: &PixelRect) -> Self {
        // `as` truncates toward zero
        let q = |v: f64| (v / BUCKET_QUANTUM) as i64;
        Self(q(rect.x), q(rect.y), q(rect.width), q(rect.height))
    }
}

/// Final output unit
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBlock {
    pub text: String,
    pub confidence: f32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub image_width: u32,
    pub image_height: u32,
    /// Pass that won the merge; omitted in single-pass mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detection_pass: Option<PassLabel>,
}

impl TextBlock {
    fn from_detection(detection: Detection) -> Self {
        let Detection {
            text,
            confidence,
            bounds,
            image_size: (image_width, image_height),
            pass,
        } = detection;
        Self {
            text,
            confidence,
            x: bounds.x,
            y: bounds.y,
            width: bounds.width,
            height: bounds.height,
            image_width,
            image_height,
            detection_pass: Some(pass),
        }
    }
}

/// Deduplicate detections across passes and sort them into reading order
pub fn merge(detections: impl IntoIterator<Item = Detection>) -> Vec<TextBlock> {
    let mut buckets: HashMap<SpatialKey, Detection> = HashMap::new();

    for detection in detections {
        let key = SpatialKey::from_rect(&detection.bounds);
        match buckets.get_mut(&key) {
            Some(best) => {
                // Ties keep the earlier detection
                if detection.confidence > best.confidence {
                    *best = detection;
                }
            }
            None => {
                buckets.insert(key, detection);
            }
        }
    }

    let blocks: Vec<TextBlock> = buckets.into_values().map(TextBlock::from_detection).collect();
    sort_reading_order(blocks)
}

/// Sort blocks top-to-bottom, then left-to-right within a line
///
/// Blocks whose `y` values differ by at most [`LINE_TOLERANCE`] are treated as
/// one line and ordered by `x`.
pub fn sort_reading_order(mut blocks: Vec<TextBlock>) -> Vec<TextBlock> {
    // Total order first so the result does not depend on hash map iteration
    blocks.sort_by(|a, b| {
        a.y.total_cmp(&b.y)
            .then_with(|| a.x.total_cmp(&b.x))
            .then_with(|| b.confidence.total_cmp(&a.confidence))
            .then_with(|| a.text.cmp(&b.text))
    });

    // Bubble boxes left along their line
    for i in 0..blocks.len().saturating_sub(1) {
        for j in (0..=i).rev() {
            if same_line(&blocks[j], &blocks[j + 1])
                && blocks[j + 1].x.total_cmp(&blocks[j].x) == Ordering::Less
            {
                blocks.swap(j, j + 1);
            } else {
                break;
            }
        }
    }

    blocks
}

fn same_line(a: &TextBlock, b: &TextBlock) -> bool {
    (a.y - b.y).abs() <= LINE_TOLERANCE
}
