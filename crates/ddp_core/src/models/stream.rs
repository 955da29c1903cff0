//! Stream properties detected by the inspector.

use serde::{Deserialize, Serialize};

/// Dialogue level used when none is detected, and the lower clamp.
pub const DEFAULT_DIALOGUE_LEVEL: i32 = -31;

/// Sample rate the encoding engine expects for PCM input.
pub const TARGET_SAMPLE_RATE: u32 = 48_000;

/// Properties of the input stream.
///
/// Produced once by the stream inspector and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    /// Whether the stream carries Atmos object metadata.
    pub atmos_present: bool,
    /// Detected dialogue level in dB, already clamped.
    pub dialogue_level: Option<i32>,
    /// Number of presentations reported.
    pub presentation_count: u32,
    /// Index of the last presentation that reported a dialogue level.
    pub last_presentation: Option<u32>,
    /// Channel layout of the last presentation, as reported.
    pub channel_layout: Option<String>,
    /// Sample rate in Hz, if reported.
    pub sample_rate: Option<u32>,
}

impl StreamInfo {
    /// Whether a PCM decode of this stream must be resampled.
    pub fn needs_resample(&self) -> bool {
        matches!(self.sample_rate, Some(rate) if rate != TARGET_SAMPLE_RATE)
    }
}
