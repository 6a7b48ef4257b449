//! TuneForge Pitch Engine
//!
//! Real-time monophonic pitch correction for voice:
//!
//! ## Features
//! - **Estimation**: YIN fundamental-frequency estimator with silence gate
//! - **Scales**: seven scale tables over any of the twelve keys
//! - **Correction**: nearest in-scale target, ratio smoothing, humanize jitter
//! - **Resynthesis**: grain-shift resampling, edge fades, block crossfade, dry/wet mix
//! - **Presets**: natural, soft, modern, hardtune, tpain
//!
//! ## Usage
//!
//! ```rust
//! use tf_pitch::{PitchCorrector, PitchEstimator, Preset};
//!
//! let sample_rate = 48000;
//! let block_size = 1024;
//! let mut estimator = PitchEstimator::new(sample_rate, block_size);
//! let mut corrector = PitchCorrector::new(sample_rate, block_size);
//! corrector.set_parameters(&Preset::HARDTUNE.parameter_update());
//!
//! let block: Vec<f32> = (0..block_size)
//!     .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 466.0 * i as f32 / 48000.0).sin())
//!     .collect();
//! let mut output = vec![0.0; block_size];
//!
//! let estimate = estimator.estimate(&block);
//! corrector.process_block(&block, estimate.frequency_hz, &mut output);
//! ```

pub mod correction;
pub mod detection;
pub mod note;
pub mod params;
pub mod scale;

mod error;

pub use correction::PitchCorrector;
pub use detection::{PitchEstimate, PitchEstimator};
pub use error::{PitchError, PitchResult};
pub use note::{
    NoteInfo, freq_to_cents, freq_to_midi, midi_to_freq, nearest_scale_note, note_to_frequency,
};
pub use params::{ControlUpdate, CorrectionParameters, ParameterUpdate, Preset};
pub use scale::{PitchClassSet, Scale, ScaleType, parse_key};
