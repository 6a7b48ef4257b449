//! Error types for the pitch engine

use thiserror::Error;

/// Pitch engine errors
///
/// Only raised at the control and configuration boundary. Block processing
/// never fails; it falls back to pass-through instead.
#[derive(Debug, Error)]
pub enum PitchError {
    /// Note name could not be parsed
    #[error("Invalid note name: {0}")]
    InvalidNoteName(String),

    /// Key name could not be parsed
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Scale name could not be parsed, or a custom scale is empty
    #[error("Invalid scale: {0}")]
    InvalidScale(String),

    /// Scale offset outside 0..=11
    #[error("Invalid scale interval: {0} (must be 0-11)")]
    InvalidInterval(u8),

    /// Invalid sample rate
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    /// Invalid block size
    #[error("Invalid block size: {0}")]
    InvalidBlockSize(usize),
}

/// Result type for pitch operations
pub type PitchResult<T> = Result<T, PitchError>;
