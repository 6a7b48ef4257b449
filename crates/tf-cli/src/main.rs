//! TuneForge command-line host
//!
//! Usage:
//!   tuneforge process in.wav out.wav --preset hardtune --key F# --scale minor
//!   tuneforge analyze in.wav --key C --scale major
//!   tuneforge presets

mod wav;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tf_pitch::{ControlUpdate, Preset, ScaleType, parse_key};
use tf_realtime::{ControlHandle, EngineConfig, PitchReport, TuneSession, session};

#[derive(Parser)]
#[command(name = "tuneforge", version, about = "Real-time voice pitch correction")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pitch-correct a WAV file
    Process(ProcessArgs),
    /// Print per-block pitch analysis
    Analyze {
        /// Input WAV file
        input: PathBuf,
        /// Samples per block
        #[arg(long, default_value_t = 1024)]
        block_size: usize,
        /// Key for the in-scale column (e.g. C, F#, Bb)
        #[arg(long, default_value = "C")]
        key: String,
        /// Scale for the in-scale column
        #[arg(long, default_value = "major")]
        scale: String,
    },
    /// List presets
    Presets,
}

#[derive(Args)]
struct ProcessArgs {
    /// Input WAV file
    input: PathBuf,
    /// Output WAV file (32-bit float mono)
    output: PathBuf,
    /// Preset applied before individual controls
    #[arg(short, long)]
    preset: Option<String>,
    /// Key (e.g. C, F#, Bb)
    #[arg(short, long)]
    key: Option<String>,
    /// Scale (major, minor, pentatonic, blues, dorian, mixolydian, chromatic)
    #[arg(short, long)]
    scale: Option<String>,
    /// Correction amount (0-100)
    #[arg(long)]
    correction: Option<f32>,
    /// Retune speed (0-100, 0 = instant)
    #[arg(long)]
    speed: Option<f32>,
    /// Humanize (0-100)
    #[arg(long)]
    humanize: Option<f32>,
    /// Formant (0-100, 50 = neutral)
    #[arg(long)]
    formant: Option<f32>,
    /// Dry/wet mix (0-100)
    #[arg(long)]
    mix: Option<f32>,
    /// Samples per block
    #[arg(long)]
    block_size: Option<usize>,
    /// YIN threshold (0.01-0.5)
    #[arg(long)]
    threshold: Option<f32>,
    /// Pass audio through untouched
    #[arg(long)]
    bypass: bool,
    /// Engine config JSON
    #[arg(long)]
    config: Option<PathBuf>,
    /// Control update JSON, applied after the preset
    #[arg(long)]
    controls: Option<PathBuf>,
}

impl ProcessArgs {
    fn control_update(&self) -> ControlUpdate {
        ControlUpdate {
            key: self.key.clone(),
            scale: self.scale.clone(),
            correction: self.correction,
            speed: self.speed,
            humanize: self.humanize,
            formant: self.formant,
            mix: self.mix,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Process(args) => process(&args),
        Commands::Analyze {
            input,
            block_size,
            key,
            scale,
        } => analyze(&input, block_size, &key, &scale),
        Commands::Presets => {
            list_presets();
            Ok(())
        }
    }
}

fn process(args: &ProcessArgs) -> Result<()> {
    validate_key_and_scale(args.key.as_deref(), args.scale.as_deref())?;

    let audio = wav::read_mono(&args.input)?;
    log::info!(
        "Loaded {}: {} samples @ {} Hz, {} channel(s)",
        args.input.display(),
        audio.samples.len(),
        audio.sample_rate,
        audio.source_channels
    );

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => EngineConfig::default(),
    };
    config.sample_rate = audio.sample_rate;
    if let Some(block_size) = args.block_size {
        config.block_size = block_size;
    }
    if let Some(threshold) = args.threshold {
        config.yin_threshold = threshold;
    }

    let (mut control, mut engine) = session(&config)?;

    if let Some(name) = &args.preset {
        if !control.apply_preset(name) {
            bail!("unknown preset '{}' (see `tuneforge presets`)", name);
        }
    }
    if let Some(path) = &args.controls {
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let update = ControlUpdate::from_json(&json)
            .with_context(|| format!("invalid control update in {}", path.display()))?;
        control.apply_controls(&update);
    }
    control.apply_controls(&args.control_update());
    control.set_bypass(args.bypass);

    let params = control.parameters();
    log::info!(
        "{}: correction {:.2}, speed {:.1} ms, humanize {:.2}, mix {:.2}",
        params.scale().name(),
        params.correction_amount,
        params.speed_ms,
        params.humanize_amount,
        params.mix
    );

    let mut voiced_blocks = 0;
    let output = run_blocks(&audio.samples, &mut control, &mut engine, |report| {
        if report.estimate.is_voiced() {
            voiced_blocks += 1;
        }
    });
    engine.stop();

    wav::write_mono(&args.output, &output, audio.sample_rate)?;

    let total_blocks = audio.samples.len().div_ceil(config.block_size);
    println!(
        "Wrote {} ({} samples, {}/{} blocks voiced)",
        args.output.display(),
        output.len(),
        voiced_blocks,
        total_blocks
    );
    Ok(())
}

fn analyze(input: &Path, block_size: usize, key: &str, scale: &str) -> Result<()> {
    validate_key_and_scale(Some(key), Some(scale))?;

    let audio = wav::read_mono(input)?;
    let config = EngineConfig {
        sample_rate: audio.sample_rate,
        block_size,
        ..Default::default()
    };
    let (mut control, mut engine) = session(&config)?;
    control.apply_controls(&ControlUpdate {
        key: Some(key.to_string()),
        scale: Some(scale.to_string()),
        ..Default::default()
    });
    // Analysis only; audio output is discarded
    control.set_bypass(true);

    println!(
        "{:>5}  {:>8}  {:>9}  {:>5}  {:>5}  {:>6}  {:>9}",
        "block", "time_s", "freq_hz", "conf", "note", "cents", "target_hz"
    );

    let mut block = 0usize;
    run_blocks(&audio.samples, &mut control, &mut engine, |report| {
        let time = (block * block_size) as f32 / audio.sample_rate as f32;
        match report.note {
            Some(note) => println!(
                "{:>5}  {:>8.3}  {:>9.2}  {:>5.2}  {:>5}  {:>+6.1}  {:>9.2}",
                block,
                time,
                report.estimate.frequency_hz,
                report.estimate.confidence,
                note.label(),
                note.cents_offset,
                report.target_hz
            ),
            None => println!("{:>5}  {:>8.3}  {:>9}", block, time, "-"),
        }
        block += 1;
    });
    engine.stop();
    Ok(())
}

fn list_presets() {
    println!(
        "{:<10}  {:>10}  {:>5}  {:>8}  {:>7}  {:>3}",
        "name", "correction", "speed", "humanize", "formant", "mix"
    );
    for preset in &Preset::ALL {
        println!(
            "{:<10}  {:>10}  {:>5}  {:>8}  {:>7}  {:>3}",
            preset.name,
            preset.correction,
            preset.speed,
            preset.humanize,
            preset.formant,
            preset.mix
        );
    }
}

/// Feed `samples` through the session block by block
///
/// The last partial block is zero-padded; the returned signal has the
/// input's length. `on_report` sees every analysis report in order.
fn run_blocks(
    samples: &[f32],
    control: &mut ControlHandle,
    engine: &mut TuneSession,
    mut on_report: impl FnMut(&PitchReport),
) -> Vec<f32> {
    let block_size = engine.block_size();
    let mut input = vec![0.0; block_size];
    let mut output = vec![0.0; block_size];
    let mut result = Vec::with_capacity(samples.len());

    for chunk in samples.chunks(block_size) {
        input[..chunk.len()].copy_from_slice(chunk);
        input[chunk.len()..].fill(0.0);

        engine.process(&input, &mut output);
        result.extend_from_slice(&output[..chunk.len()]);

        for report in control.poll_reports() {
            on_report(&report);
        }
    }
    result
}

fn load_config(path: &Path) -> Result<EngineConfig> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    EngineConfig::from_json(&json)
        .with_context(|| format!("invalid config in {}", path.display()))
}

/// Reject bad names up front; the control path would only log and skip them
fn validate_key_and_scale(key: Option<&str>, scale: Option<&str>) -> Result<()> {
    if let Some(key) = key {
        parse_key(key)?;
    }
    if let Some(scale) = scale {
        scale.parse::<ScaleType>()?;
    }
    Ok(())
}
