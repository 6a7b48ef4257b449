//! Session configuration

use serde::{Deserialize, Serialize};
use tf_pitch::detection::DEFAULT_THRESHOLD;
use tf_pitch::{PitchError, PitchResult};

/// Smallest supported block
pub const MIN_BLOCK_SIZE: usize = 32;

/// Largest supported block
pub const MAX_BLOCK_SIZE: usize = 16384;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sample rate (Hz)
    pub sample_rate: u32,
    /// Samples per processed block
    pub block_size: usize,
    /// YIN threshold, clamped to [0.01, 0.5]
    pub yin_threshold: f32,
    /// Capacity of the analysis report ring
    pub report_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            block_size: 1024,
            yin_threshold: DEFAULT_THRESHOLD,
            report_capacity: 64,
        }
    }
}

impl EngineConfig {
    /// Parse from JSON; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Check sample rate and block size
    pub fn validate(&self) -> PitchResult<()> {
        if self.sample_rate == 0 {
            return Err(PitchError::InvalidSampleRate(self.sample_rate));
        }
        if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&self.block_size) {
            return Err(PitchError::InvalidBlockSize(self.block_size));
        }
        Ok(())
    }

    /// Block duration in milliseconds
    pub fn block_duration_ms(&self) -> f32 {
        self.block_size as f32 * 1000.0 / self.sample_rate as f32
    }
}
