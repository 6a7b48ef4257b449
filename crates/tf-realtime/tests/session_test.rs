//! Session integration tests
//!
//! Drives a control handle and an audio session end to end:
//! - Bypass is bit-exact
//! - Snapshots reach the audio side whole
//! - Reset and bypass transitions clear corrector state
//! - Reports reach the control side

use std::thread;

use approx::assert_abs_diff_eq;

use tf_pitch::{
    ControlUpdate, CorrectionParameters, ParameterUpdate, PitchEstimator, ScaleType, freq_to_cents,
};
use tf_realtime::{EngineConfig, session};

const SAMPLE_RATE: u32 = 48000;
const BLOCK_SIZE: usize = 1024;

fn config() -> EngineConfig {
    EngineConfig {
        sample_rate: SAMPLE_RATE,
        block_size: BLOCK_SIZE,
        ..Default::default()
    }
}

/// Generate test sine wave starting at sample `offset`
fn generate_sine(freq: f32, offset: usize, len: usize) -> Vec<f32> {
    (offset..offset + len)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            0.5 * (2.0 * std::f32::consts::PI * freq * t).sin()
        })
        .collect()
}

/// Whichever of A4/B4 the input is nearer to in cents (ties go low)
fn nearer_of_a4_b4(freq: f32) -> f32 {
    let to_a = freq_to_cents(freq, 440.0).abs();
    let to_b = freq_to_cents(freq, 493.883).abs();
    if to_b < to_a { 493.883 } else { 440.0 }
}

#[test]
fn test_bypass_is_bit_exact() {
    let (mut control, mut audio) = session(&config()).unwrap();
    control.apply_preset("tpain");
    assert!(!control.is_bypassed());
    control.set_bypass(true);
    assert!(control.is_bypassed());

    for block in 0..4 {
        let input = generate_sine(466.0, block * BLOCK_SIZE, BLOCK_SIZE);
        let mut output = vec![0.0; BLOCK_SIZE];
        let estimate = audio.process(&input, &mut output);

        assert_eq!(output, input, "bypass altered block {}", block);
        assert!(estimate.is_voiced(), "estimator should run while bypassed");
    }

    let report = control.latest_report().unwrap();
    assert!(report.bypassed);
    assert_eq!(report.smoothed_ratio, 1.0);
}

#[test]
fn test_c_major_snaps_466_to_nearest_scale_note() {
    let (mut control, mut audio) = session(&config()).unwrap();
    control.apply_controls(&ControlUpdate {
        key: Some("C".to_string()),
        scale: Some("major".to_string()),
        ..Default::default()
    });
    assert!(control.apply_preset("tpain"));

    let input = generate_sine(466.0, 0, BLOCK_SIZE);
    let mut output = vec![0.0; BLOCK_SIZE];
    let estimate = audio.process(&input, &mut output);

    assert!(estimate.is_voiced());
    assert!(
        (estimate.frequency_hz - 466.0).abs() < 466.0 * 0.01,
        "estimated {}",
        estimate.frequency_hz
    );

    let expected_target = nearer_of_a4_b4(estimate.frequency_hz);
    let expected_ratio = expected_target / estimate.frequency_hz;
    assert_abs_diff_eq!(audio.smoothed_ratio(), expected_ratio, epsilon = 1e-4);

    let report = control.latest_report().unwrap();
    assert!(!report.bypassed);
    assert_abs_diff_eq!(report.target_hz, expected_target, epsilon = 0.01);
    assert_eq!(report.note.unwrap().note_name, "A#");

    let mut probe = PitchEstimator::new(SAMPLE_RATE, BLOCK_SIZE);
    let corrected = probe.estimate(&output);
    assert!(
        freq_to_cents(corrected.frequency_hz, expected_target).abs() < 25.0,
        "corrected block at {} Hz, target {}",
        corrected.frequency_hz,
        expected_target
    );
}

#[test]
fn test_parameter_changes_apply_at_next_block() {
    let (mut control, mut audio) = session(&config()).unwrap();
    let input = generate_sine(220.0, 0, BLOCK_SIZE);
    let mut output = vec![0.0; BLOCK_SIZE];

    audio.process(&input, &mut output);
    assert_eq!(audio.active_parameters().key, 0);

    control.set_parameters(&ParameterUpdate {
        key: Some(2),
        scale: Some(ScaleType::Minor),
        ..Default::default()
    });
    assert_eq!(control.parameters().key, 2);
    // Not yet seen by the audio side
    assert_eq!(audio.active_parameters().key, 0);

    audio.process(&input, &mut output);
    assert_eq!(audio.active_parameters().key, 2);
    assert_eq!(audio.active_parameters().scale, ScaleType::Minor);

    // Wholesale replacement discards the earlier merge
    let replacement = CorrectionParameters {
        mix: 0.25,
        ..Default::default()
    };
    control.replace_parameters(replacement);
    assert_eq!(*control.parameters(), replacement);

    audio.process(&input, &mut output);
    assert_eq!(*audio.active_parameters(), replacement);
    assert_eq!(audio.active_parameters().key, 0);
    assert_eq!(audio.active_parameters().scale, ScaleType::Major);
}

#[test]
fn test_correction_zero_is_passthrough() {
    let (mut control, mut audio) = session(&config()).unwrap();
    control.set_parameters(&ParameterUpdate {
        correction_amount: Some(0.0),
        ..Default::default()
    });

    let input = generate_sine(466.0, 0, BLOCK_SIZE);
    let mut output = vec![0.0; BLOCK_SIZE];
    audio.process(&input, &mut output);
    assert_eq!(output, input);
}

#[test]
fn test_reset_request_clears_ratio() {
    let (mut control, mut audio) = session(&config()).unwrap();
    control.apply_preset("tpain");

    let input = generate_sine(466.0, 0, BLOCK_SIZE);
    let mut output = vec![0.0; BLOCK_SIZE];
    audio.process(&input, &mut output);
    assert!((audio.smoothed_ratio() - 1.0).abs() > 0.01);

    // Unvoiced blocks keep the ratio unless a reset arrives
    let silence = vec![0.0; BLOCK_SIZE];
    audio.process(&silence, &mut output);
    assert!((audio.smoothed_ratio() - 1.0).abs() > 0.01);

    control.request_reset();
    audio.process(&silence, &mut output);
    assert_eq!(audio.smoothed_ratio(), 1.0);
    assert!(output.iter().all(|&s| s == 0.0));
}

#[test]
fn test_leaving_bypass_resets_corrector() {
    let (mut control, mut audio) = session(&config()).unwrap();
    control.apply_preset("tpain");

    let input = generate_sine(466.0, 0, BLOCK_SIZE);
    let silence = vec![0.0; BLOCK_SIZE];
    let mut output = vec![0.0; BLOCK_SIZE];

    audio.process(&input, &mut output);
    let engaged_ratio = audio.smoothed_ratio();
    assert!((engaged_ratio - 1.0).abs() > 0.01);

    control.set_bypass(true);
    audio.process(&silence, &mut output);
    // Bypass does not touch corrector state
    assert_eq!(audio.smoothed_ratio(), engaged_ratio);

    control.set_bypass(false);
    audio.process(&silence, &mut output);
    assert_eq!(audio.smoothed_ratio(), 1.0);
}

#[test]
fn test_stop_resets_state() {
    let (mut control, mut audio) = session(&config()).unwrap();
    control.apply_preset("hardtune");

    let input = generate_sine(466.0, 0, BLOCK_SIZE);
    let mut output = vec![0.0; BLOCK_SIZE];
    audio.process(&input, &mut output);
    assert!((audio.smoothed_ratio() - 1.0).abs() > 0.01);

    audio.stop();
    assert_eq!(audio.smoothed_ratio(), 1.0);
}

#[test]
fn test_reports_arrive_in_order() {
    let (mut control, mut audio) = session(&config()).unwrap();
    let silence = vec![0.0; BLOCK_SIZE];
    let voiced = generate_sine(330.0, 0, BLOCK_SIZE);
    let mut output = vec![0.0; BLOCK_SIZE];

    audio.process(&silence, &mut output);
    audio.process(&voiced, &mut output);

    let reports: Vec<_> = control.poll_reports().collect();
    assert_eq!(reports.len(), 2);

    assert!(!reports[0].estimate.is_voiced());
    assert_eq!(reports[0].estimate.confidence, 0.0);
    assert!(reports[0].note.is_none());
    assert_eq!(reports[0].target_hz, 0.0);

    assert!(reports[1].estimate.is_voiced());
    let note = reports[1].note.unwrap();
    assert_eq!(note.label(), "E4");
    // E is in C major
    assert!((reports[1].target_hz - note.exact_frequency).abs() < 0.01);

    assert!(control.poll_reports().next().is_none());
}

#[test]
fn test_cross_thread_snapshots_are_consistent() {
    let (mut control, mut audio) = session(&config()).unwrap();
    let input = generate_sine(220.0, 0, BLOCK_SIZE);
    let mut output = vec![0.0; BLOCK_SIZE];

    let writer = thread::spawn(move || {
        for step in 0..=1000 {
            let v = step as f32 / 1000.0;
            control.set_parameters(&ParameterUpdate {
                correction_amount: Some(v),
                humanize_amount: Some(v),
                mix: Some(v),
                ..Default::default()
            });
        }
        control
    });

    for _ in 0..200 {
        audio.process(&input, &mut output);
        let active = audio.active_parameters();
        assert_eq!(active.correction_amount, active.mix, "torn snapshot");
        assert_eq!(active.humanize_amount, active.mix, "torn snapshot");
        assert!(output.iter().all(|s| s.is_finite()));
    }

    let _control = writer.join().unwrap();
    audio.process(&input, &mut output);
    assert_eq!(audio.active_parameters().mix, 1.0);
}
