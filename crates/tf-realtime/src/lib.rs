//! # TuneForge Real-Time Session
//!
//! Runs the pitch engine on an audio thread while a control thread edits it:
//! - Lock-free parameter snapshots (triple buffer)
//! - Bypass and reset flags
//! - Analysis report queue for tuner displays
//!
//! ```rust
//! use tf_realtime::{EngineConfig, session};
//!
//! let config = EngineConfig::default();
//! let (mut control, mut audio) = session(&config).unwrap();
//! control.apply_preset("hardtune");
//!
//! let input = vec![0.0f32; config.block_size];
//! let mut output = vec![0.0f32; config.block_size];
//! audio.process(&input, &mut output);
//!
//! let report = control.latest_report().unwrap();
//! assert!(!report.estimate.is_voiced());
//! ```

pub mod config;
pub mod session;
pub mod state;

pub use config::*;
pub use session::*;
pub use state::*;
