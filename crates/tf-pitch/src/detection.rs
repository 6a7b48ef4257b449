//! Fundamental-frequency estimation (YIN)
//!
//! Block-wise YIN with cumulative mean normalization, first-dip threshold
//! search and parabolic refinement. The estimator keeps a single scratch
//! buffer of N/2 lags and is otherwise stateless across blocks.

use serde::Serialize;

/// RMS below which a block is treated as silence
pub const SILENCE_RMS: f32 = 0.01;

/// Default CMND threshold
pub const DEFAULT_THRESHOLD: f32 = 0.15;

/// Lowest accepted fundamental
pub const MIN_FREQUENCY_HZ: f32 = 50.0;

/// Highest accepted fundamental
pub const MAX_FREQUENCY_HZ: f32 = 1200.0;

/// First lag examined by the threshold search
const MIN_LAG: usize = 2;

/// Result of one estimation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PitchEstimate {
    /// Fundamental in Hz, 0.0 when unvoiced
    pub frequency_hz: f32,
    /// Confidence (0-1)
    pub confidence: f32,
}

impl PitchEstimate {
    /// No usable pitch in the block
    pub const UNVOICED: Self = Self {
        frequency_hz: 0.0,
        confidence: 0.0,
    };

    #[inline]
    pub fn is_voiced(&self) -> bool {
        self.frequency_hz > 0.0
    }

    /// Frequency if voiced
    #[inline]
    pub fn frequency(&self) -> Option<f32> {
        self.is_voiced().then_some(self.frequency_hz)
    }
}

/// YIN pitch estimator
#[derive(Debug, Clone)]
pub struct PitchEstimator {
    /// Sample rate
    sample_rate: u32,
    /// YIN threshold
    threshold: f32,
    /// Difference function, normalized in place into the CMND
    cmnd_buffer: Vec<f32>,
}

impl PitchEstimator {
    /// Create an estimator for blocks of up to `block_size` samples
    pub fn new(sample_rate: u32, block_size: usize) -> Self {
        Self {
            sample_rate,
            threshold: DEFAULT_THRESHOLD,
            cmnd_buffer: vec![0.0; block_size / 2],
        }
    }

    /// Set YIN threshold, clamped to [0.01, 0.5]
    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold.clamp(0.01, 0.5);
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Estimate the fundamental of one block
    pub fn estimate(&mut self, block: &[f32]) -> PitchEstimate {
        let half = block.len() / 2;
        if half <= MIN_LAG || rms(block) < SILENCE_RMS {
            return PitchEstimate::UNVOICED;
        }

        if half > self.cmnd_buffer.len() {
            log::warn!(
                "PitchEstimator: growing scratch buffer from {} to {} lags",
                self.cmnd_buffer.len(),
                half
            );
            self.cmnd_buffer.resize(half, 0.0);
        }

        self.difference_function(block, half);
        self.cumulative_mean_normalized_difference(half);

        let Some(tau) = self.absolute_threshold(half) else {
            return PitchEstimate::UNVOICED;
        };

        let tau_refined = self.parabolic_interpolation(tau, half);
        if tau_refined <= 0.0 || !tau_refined.is_finite() {
            return PitchEstimate::UNVOICED;
        }

        let frequency = self.sample_rate as f32 / tau_refined;
        if !(MIN_FREQUENCY_HZ..=MAX_FREQUENCY_HZ).contains(&frequency) {
            return PitchEstimate::UNVOICED;
        }

        PitchEstimate {
            frequency_hz: frequency,
            confidence: (1.0 - self.cmnd_buffer[tau]).clamp(0.0, 1.0),
        }
    }

    /// d(tau) = sum_{i < N/2} (x[i] - x[i + tau])^2
    fn difference_function(&mut self, samples: &[f32], half: usize) {
        let window = &samples[..half];
        for (tau, d) in self.cmnd_buffer[..half].iter_mut().enumerate() {
            let lagged = &samples[tau..tau + half];
            *d = window
                .iter()
                .zip(lagged)
                .map(|(a, b)| {
                    let diff = a - b;
                    diff * diff
                })
                .sum();
        }
    }

    /// d'(0) = 1, d'(tau) = d(tau) * tau / sum_{k=1}^{tau} d(k)
    fn cumulative_mean_normalized_difference(&mut self, half: usize) {
        self.cmnd_buffer[0] = 1.0;
        let mut running_sum = 0.0f32;

        for tau in 1..half {
            let d = self.cmnd_buffer[tau];
            running_sum += d;
            self.cmnd_buffer[tau] = if running_sum > 0.0 {
                d * tau as f32 / running_sum
            } else {
                1.0
            };
        }
    }

    /// First lag under the threshold, walked down to the bottom of its dip
    fn absolute_threshold(&self, half: usize) -> Option<usize> {
        let cmnd = &self.cmnd_buffer[..half];
        let mut tau = (MIN_LAG..half).find(|&t| cmnd[t] < self.threshold)?;
        while tau + 1 < half && cmnd[tau + 1] < cmnd[tau] {
            tau += 1;
        }
        Some(tau)
    }

    /// Parabolic interpolation for sub-sample accuracy
    fn parabolic_interpolation(&self, tau: usize, half: usize) -> f32 {
        let cmnd = &self.cmnd_buffer[..half];
        let x0 = if tau < 1 { tau } else { tau - 1 };
        let x2 = if tau + 1 < half { tau + 1 } else { tau };

        if x0 == tau {
            return if cmnd[tau] <= cmnd[x2] { tau as f32 } else { x2 as f32 };
        }
        if x2 == tau {
            return if cmnd[tau] <= cmnd[x0] { tau as f32 } else { x0 as f32 };
        }

        let s0 = cmnd[x0];
        let s1 = cmnd[tau];
        let s2 = cmnd[x2];
        let adjustment = (s2 - s0) / (2.0 * (2.0 * s1 - s2 - s0));

        if adjustment.is_finite() {
            tau as f32 + adjustment
        } else {
            tau as f32
        }
    }
}

/// Root-mean-square level of a block
pub fn rms(block: &[f32]) -> f32 {
    if block.is_empty() {
        return 0.0;
    }
    let sum: f32 = block.iter().map(|x| x * x).sum();
    (sum / block.len() as f32).sqrt()
}
