//! Scene luminance sampling
//!
//! Brightness is the ITU-R BT.601 luma average over every pixel of the frame.
//! It predicts scan quality better than a flat RGB mean because it weights
//! green (which dominates perceived brightness) most heavily.

use crate::types::LuminanceFrame;
use serde::{Deserialize, Serialize};

/// ITU-R BT.601 luma weights for R, G and B
pub const LUMA_WEIGHTS: [f64; 3] = [0.299, 0.587, 0.114];

/// Default readiness threshold in lux-equivalent units
pub const MIN_LUMINANCE: f32 = 200.0;

/// Compute the mean perceptual luminance of a frame, rounded to 0-255.
///
/// An empty frame samples as 0.
pub fn sample(frame: &LuminanceFrame) -> u8 {
    let stride = frame.format.bytes_per_pixel();
    let mut sum = 0.0f64;
    let mut pixels = 0usize;

    for px in frame.data.chunks_exact(stride) {
        sum += LUMA_WEIGHTS[0] * px[0] as f64
            + LUMA_WEIGHTS[1] * px[1] as f64
            + LUMA_WEIGHTS[2] * px[2] as f64;
        pixels += 1;
    }

    if pixels == 0 {
        return 0;
    }

    (sum / pixels as f64).round().clamp(0.0, 255.0) as u8
}

/// How close a sample is to the threshold, as a 0-100 meter value
pub fn readiness_percent(value: u8, min_luminance: f32) -> f32 {
    if min_luminance <= 0.0 {
        return 100.0;
    }
    (value as f32 / min_luminance * 100.0).min(100.0)
}

/// One sample evaluated against the threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LuminanceReading {
    pub value: u8,
    pub min_luminance: f32,
    pub sufficient: bool,
    pub readiness_percent: f32,
}

impl LuminanceReading {
    pub fn evaluate(value: u8, min_luminance: f32) -> Self {
        Self {
            value,
            min_luminance,
            sufficient: value as f32 >= min_luminance,
            readiness_percent: readiness_percent(value, min_luminance),
        }
    }

    pub fn from_frame(frame: &LuminanceFrame, min_luminance: f32) -> Self {
        Self::evaluate(sample(frame), min_luminance)
    }
}
