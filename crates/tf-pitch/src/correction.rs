//! Real-time pitch correction
//!
//! Per block:
//! 1. Quantize the detected frequency to the nearest in-scale note (plus humanize jitter)
//! 2. Blend the resampling ratio toward 1.0 by the correction amount
//! 3. Smooth the ratio across blocks (one-pole, driven by the speed setting)
//! 4. Grain shift: linear-interpolation resampling, half-Hann edge fades
//! 5. Crossfade against the tail of the previous output block
//! 6. Dry/wet mix, then keep the new tail
//!
//! All buffers are sized at construction; `process_block` does not allocate
//! for blocks up to the configured size.

use crate::note::{A4_FREQUENCY, A4_MIDI};
use crate::params::{CorrectionParameters, HUMANIZE_MAX_CENTS, ParameterUpdate};
use crate::scale::PitchClassSet;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Samples blended against the previous block's tail
pub const CROSSFADE_LENGTH: usize = 128;

/// Upper bound on the edge fade length
pub const MAX_EDGE_FADE: usize = 64;

/// Target search window, in semitones either side of the rounded input
pub const TARGET_SEARCH_SEMITONES: i32 = 6;

/// Ratios this close to 1.0 skip resampling
pub const UNITY_TOLERANCE: f32 = 0.001;

/// Block-wise pitch corrector
///
/// Owns the cross-block state (smoothed ratio, crossfade tail). One instance
/// serves one stream; blocks must arrive in order from a single thread.
#[derive(Debug, Clone)]
pub struct PitchCorrector {
    /// Sample rate
    sample_rate: u32,
    /// Parameters used for the next block
    params: CorrectionParameters,
    /// Smoothed resampling ratio, carried across blocks
    smoothed_ratio: f32,
    /// Last output samples of the previous block
    tail: Vec<f32>,
    /// Valid samples in `tail`; 0 while cold
    tail_len: usize,
    /// Resampled (wet) scratch block
    wet: Vec<f32>,
    /// Humanize jitter source
    rng: StdRng,
}

impl PitchCorrector {
    /// Create a corrector for blocks of up to `max_block_size` samples
    pub fn new(sample_rate: u32, max_block_size: usize) -> Self {
        Self::with_rng(sample_rate, max_block_size, StdRng::from_os_rng())
    }

    /// Create with a fixed humanize seed (reproducible output)
    pub fn with_seed(sample_rate: u32, max_block_size: usize, seed: u64) -> Self {
        Self::with_rng(sample_rate, max_block_size, StdRng::seed_from_u64(seed))
    }

    fn with_rng(sample_rate: u32, max_block_size: usize, rng: StdRng) -> Self {
        Self {
            sample_rate,
            params: CorrectionParameters::default(),
            smoothed_ratio: 1.0,
            tail: vec![0.0; CROSSFADE_LENGTH],
            tail_len: 0,
            wet: vec![0.0; max_block_size],
            rng,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Merge a partial update; applies from the next block
    pub fn set_parameters(&mut self, update: &ParameterUpdate) {
        self.params.apply(update);
    }

    /// Replace all parameters at once
    pub fn set_snapshot(&mut self, params: CorrectionParameters) {
        self.params = params;
    }

    pub fn parameters(&self) -> &CorrectionParameters {
        &self.params
    }

    /// Pitch classes of the active key and scale
    pub fn scale_pitch_classes(&self) -> PitchClassSet {
        self.params.pitch_classes()
    }

    pub fn smoothed_ratio(&self) -> f32 {
        self.smoothed_ratio
    }

    /// True once a block has been processed since construction or reset
    pub fn is_warm(&self) -> bool {
        self.tail_len > 0
    }

    /// Nearest in-scale frequency, with humanize jitter
    ///
    /// Non-positive input is returned unchanged. Candidates are visited at
    /// offsets 0, -1, +1, -2, +2 .. ±6 from the rounded semitone and only a
    /// strictly closer candidate replaces the current best, so ties resolve to
    /// the smaller offset. Jitter is redrawn on every call.
    pub fn target_frequency(&mut self, detected_hz: f32, pitch_classes: PitchClassSet) -> f32 {
        if !is_positive(detected_hz) {
            return detected_hz;
        }

        let semitones = 12.0 * (detected_hz / A4_FREQUENCY).log2();
        let rounded = semitones.round() as i32;

        let mut best: Option<(i32, f32)> = None;
        for step in 0..=2 * TARGET_SEARCH_SEMITONES {
            let offset = if step % 2 == 0 { step / 2 } else { -(step + 1) / 2 };
            let candidate = rounded + offset;
            if !pitch_classes.contains_midi(candidate + A4_MIDI) {
                continue;
            }
            let distance = (candidate as f32 - semitones).abs();
            if best.is_none_or(|(_, d)| distance < d) {
                best = Some((candidate, distance));
            }
        }

        let Some((candidate, _)) = best else {
            return detected_hz;
        };

        let target = A4_FREQUENCY * 2.0f32.powf(candidate as f32 / 12.0);
        let humanize = self.params.humanize_amount;
        if humanize > 0.0 {
            let cents = self.rng.random_range(-1.0f32..=1.0) * humanize * HUMANIZE_MAX_CENTS;
            target * 2.0f32.powf(cents / 1200.0)
        } else {
            target
        }
    }

    /// Correct one block
    ///
    /// `output` receives `input.len()` samples (extra output samples are left
    /// untouched). Unvoiced input, or a correction amount of zero, passes
    /// through unchanged.
    pub fn process_block(&mut self, input: &[f32], detected_hz: f32, output: &mut [f32]) {
        let n = input.len().min(output.len());
        let input = &input[..n];
        let output = &mut output[..n];
        if n == 0 {
            return;
        }

        let params = self.params;
        if params.correction_amount <= 0.0 {
            // Dry output, but the ratio still relaxes toward 1.0 and the tail
            // follows the signal so re-engaging starts from current state
            output.copy_from_slice(input);
            let alpha = self.smoothing_alpha(n);
            self.smoothed_ratio += (1.0 - self.smoothed_ratio) * alpha;
            self.store_tail(output);
            return;
        }

        let target_hz = self.target_frequency(detected_hz, params.pitch_classes());
        if !is_positive(detected_hz) || !is_positive(target_hz) {
            output.copy_from_slice(input);
            return;
        }

        let raw_ratio = target_hz / detected_hz;
        let desired_ratio = 1.0 + (raw_ratio - 1.0) * params.correction_amount;
        let alpha = self.smoothing_alpha(n);
        self.smoothed_ratio += (desired_ratio - self.smoothed_ratio) * alpha;

        if self.wet.len() < n {
            log::warn!(
                "PitchCorrector: growing scratch buffer from {} to {} samples",
                self.wet.len(),
                n
            );
            self.wet.resize(n, 0.0);
        }

        let wet = &mut self.wet[..n];
        grain_shift(input, self.smoothed_ratio, wet);
        apply_edge_fade(wet);
        if self.tail_len > 0 {
            crossfade(wet, &self.tail[..self.tail_len]);
        }

        let dry_gain = 1.0 - params.mix;
        for ((out, &dry), &shifted) in output.iter_mut().zip(input).zip(wet.iter()) {
            *out = dry * dry_gain + shifted * params.mix;
        }

        self.store_tail(output);
    }

    /// Reset smoothing and crossfade state (new stream)
    pub fn reset(&mut self) {
        self.smoothed_ratio = 1.0;
        self.tail.fill(0.0);
        self.tail_len = 0;
    }

    /// One-pole coefficient for a block of `n` samples
    fn smoothing_alpha(&self, n: usize) -> f32 {
        let speed_samples = (self.params.speed_ms / 1000.0 * self.sample_rate as f32).max(1.0);
        (n as f32 / speed_samples).min(1.0)
    }

    fn store_tail(&mut self, output: &[f32]) {
        let k = output.len().min(CROSSFADE_LENGTH);
        self.tail[..k].copy_from_slice(&output[output.len() - k..]);
        self.tail[k..].fill(0.0);
        self.tail_len = k;
    }
}

#[inline]
fn is_positive(value: f32) -> bool {
    value > 0.0 && value.is_finite()
}

/// Resample `input` into `output` by `ratio` (linear interpolation)
///
/// Output sample `i` reads input position `i * ratio`; reads past the end are
/// zero. Ratios within [`UNITY_TOLERANCE`] of 1.0 copy straight through.
pub fn grain_shift(input: &[f32], ratio: f32, output: &mut [f32]) {
    if (ratio - 1.0).abs() < UNITY_TOLERANCE {
        let n = input.len().min(output.len());
        output[..n].copy_from_slice(&input[..n]);
        output[n..].fill(0.0);
        return;
    }

    for (i, out) in output.iter_mut().enumerate() {
        let position = i as f32 * ratio;
        let index = position.floor() as usize;
        let frac = position - index as f32;
        let a = input.get(index).copied().unwrap_or(0.0);
        let b = input.get(index + 1).copied().unwrap_or(0.0);
        *out = a + (b - a) * frac;
    }
}

/// Half-Hann fade over the first and last `min(64, N/4)` samples
pub fn apply_edge_fade(block: &mut [f32]) {
    let n = block.len();
    let fade_len = MAX_EDGE_FADE.min(n / 4);
    for i in 0..fade_len {
        let gain = 0.5 * (1.0 - (std::f32::consts::PI * i as f32 / fade_len as f32).cos());
        block[i] *= gain;
        block[n - 1 - i] *= gain;
    }
}

/// Linear crossfade from `tail` into the head of `current`
pub fn crossfade(current: &mut [f32], tail: &[f32]) {
    let len = CROSSFADE_LENGTH.min(current.len()).min(tail.len());
    for (i, (cur, &prev)) in current[..len].iter_mut().zip(tail).enumerate() {
        let t = i as f32 / len as f32;
        *cur = *cur * t + prev * (1.0 - t);
    }
}
