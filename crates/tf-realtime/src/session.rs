//! Control/audio session split
//!
//! [`ControlHandle`] lives on the control thread and owns the staging
//! parameters. [`TuneSession`] lives on the audio thread and owns the
//! estimator, the corrector and all scratch memory. They share only a
//! snapshot channel, two atomic flags and a report ring.

use std::sync::Arc;

use portable_atomic::{AtomicBool, Ordering};
use rtrb::{Consumer, Producer, RingBuffer};
use serde::Serialize;
use tf_pitch::{
    ControlUpdate, CorrectionParameters, NoteInfo, ParameterUpdate, PitchCorrector, PitchEstimate,
    PitchEstimator, PitchResult, Preset, nearest_scale_note,
};

use crate::config::EngineConfig;
use crate::state::{SnapshotReader, SnapshotWriter, snapshot_channel};

/// Per-block analysis result for tuner displays
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PitchReport {
    /// Raw estimator output
    pub estimate: PitchEstimate,
    /// Nearest chromatic note, `None` when unvoiced
    pub note: Option<NoteInfo>,
    /// Nearest in-scale note frequency, 0.0 when unvoiced
    pub target_hz: f32,
    /// Corrector's smoothed ratio after this block
    pub smoothed_ratio: f32,
    /// Block was passed through untouched
    pub bypassed: bool,
}

struct SessionFlags {
    bypass: AtomicBool,
    reset_requested: AtomicBool,
}

/// Create a connected control handle and audio session
pub fn session(config: &EngineConfig) -> PitchResult<(ControlHandle, TuneSession)> {
    config.validate()?;

    let params = CorrectionParameters::default();
    let (writer, reader) = snapshot_channel(params);
    let (producer, consumer) = RingBuffer::new(config.report_capacity.max(1));
    let flags = Arc::new(SessionFlags {
        bypass: AtomicBool::new(false),
        reset_requested: AtomicBool::new(false),
    });

    let mut estimator = PitchEstimator::new(config.sample_rate, config.block_size);
    estimator.set_threshold(config.yin_threshold);

    let mut corrector = PitchCorrector::new(config.sample_rate, config.block_size);
    corrector.set_snapshot(params);

    log::info!(
        "Session created: {} Hz, {} samples/block ({:.1} ms)",
        config.sample_rate,
        config.block_size,
        config.block_duration_ms()
    );

    let handle = ControlHandle {
        staging: params,
        writer,
        flags: Arc::clone(&flags),
        reports: consumer,
    };
    let session = TuneSession {
        estimator,
        corrector,
        reader,
        flags,
        reports: producer,
        was_bypassed: false,
        block_size: config.block_size,
    };
    Ok((handle, session))
}

/// Control-thread half of a session
pub struct ControlHandle {
    staging: CorrectionParameters,
    writer: SnapshotWriter<CorrectionParameters>,
    flags: Arc<SessionFlags>,
    reports: Consumer<PitchReport>,
}

impl ControlHandle {
    /// Merge a partial update and publish the result
    pub fn set_parameters(&mut self, update: &ParameterUpdate) {
        if update.is_empty() {
            return;
        }
        self.staging.apply(update);
        self.writer.publish(self.staging);
    }

    /// Replace all parameters at once
    pub fn replace_parameters(&mut self, params: CorrectionParameters) {
        self.staging = params;
        self.writer.publish(self.staging);
    }

    /// Apply a control-surface update (0-100 ranges, key/scale names)
    pub fn apply_controls(&mut self, update: &ControlUpdate) {
        self.set_parameters(&update.to_parameter_update());
    }

    /// Apply a preset by name. Unknown names leave parameters unchanged.
    pub fn apply_preset(&mut self, name: &str) -> bool {
        match Preset::by_name(name) {
            Some(preset) => {
                log::info!("Applying preset '{}'", preset.name);
                self.set_parameters(&preset.parameter_update());
                true
            }
            None => {
                log::warn!("Unknown preset '{}'", name);
                false
            }
        }
    }

    /// Last published parameters
    pub fn parameters(&self) -> &CorrectionParameters {
        &self.staging
    }

    pub fn set_bypass(&self, bypass: bool) {
        self.flags.bypass.store(bypass, Ordering::Release);
    }

    pub fn is_bypassed(&self) -> bool {
        self.flags.bypass.load(Ordering::Acquire)
    }

    /// Clear corrector state at the start of the next block
    pub fn request_reset(&self) {
        self.flags.reset_requested.store(true, Ordering::Release);
    }

    /// Drain pending analysis reports, oldest first
    pub fn poll_reports(&mut self) -> impl Iterator<Item = PitchReport> + '_ {
        std::iter::from_fn(move || self.reports.pop().ok())
    }

    /// Drain pending reports and return the newest
    pub fn latest_report(&mut self) -> Option<PitchReport> {
        self.poll_reports().last()
    }
}

/// Audio-thread half of a session
pub struct TuneSession {
    estimator: PitchEstimator,
    corrector: PitchCorrector,
    reader: SnapshotReader<CorrectionParameters>,
    flags: Arc<SessionFlags>,
    reports: Producer<PitchReport>,
    was_bypassed: bool,
    block_size: usize,
}

impl TuneSession {
    /// Process one block. `output` must be at least as long as `input`.
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) -> PitchEstimate {
        if self.flags.reset_requested.swap(false, Ordering::AcqRel) {
            self.corrector.reset();
        }

        let params = *self.reader.read();
        self.corrector.set_snapshot(params);

        let estimate = self.estimator.estimate(input);
        let bypassed = self.flags.bypass.load(Ordering::Acquire);

        if bypassed {
            let len = input.len().min(output.len());
            output[..len].copy_from_slice(&input[..len]);
            self.was_bypassed = true;
        } else {
            if self.was_bypassed {
                self.corrector.reset();
                self.was_bypassed = false;
            }
            self.corrector
                .process_block(input, estimate.frequency_hz, output);
        }

        let target_hz = nearest_scale_note(estimate.frequency_hz, params.pitch_classes())
            .map_or(0.0, |note| note.exact_frequency);
        let report = PitchReport {
            estimate,
            note: NoteInfo::from_frequency(estimate.frequency_hz),
            target_hz,
            smoothed_ratio: self.corrector.smoothed_ratio(),
            bypassed,
        };
        // Full ring means nobody is reading; drop the report
        let _ = self.reports.push(report);

        estimate
    }

    /// Clear corrector state for teardown
    pub fn stop(&mut self) {
        self.corrector.reset();
        self.was_bypassed = false;
        log::debug!("Session stopped");
    }

    /// Parameters in effect for the most recent block
    pub fn active_parameters(&self) -> &CorrectionParameters {
        self.corrector.parameters()
    }

    pub fn smoothed_ratio(&self) -> f32 {
        self.corrector.smoothed_ratio()
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn sample_rate(&self) -> u32 {
        self.estimator.sample_rate()
    }
}
