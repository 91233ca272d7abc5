//! Error taxonomy.
//!
//! Construction-time misconfiguration (bad frequency ranges, unparseable note
//! literals, non-positive FFT sizes, malformed bands) is a [`ConfigError`] and
//! is fatal at construction. Failures opening an audio source are a
//! [`SourceError`] and are fatal for the run. Everything else that needs to
//! bubble up through the driver/CLI uses [`Res`].

use thiserror::Error;

/// Convenience alias for fallible driver/CLI operations.
pub type Res<T> = anyhow::Result<T>;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("invalid frequency {frequency} Hz, valid range is ({min}, {max}]")]
    InvalidFrequency { frequency: f32, min: f32, max: f32 },

    #[error("'{0}' is not a valid note literal")]
    UnparseableNote(String),

    #[error("fft size must be positive, got {0}")]
    NonPositiveFftSize(i64),

    #[error("invalid band ({low}, {high}): low must be < high")]
    InvalidBand { low: f32, high: f32 },
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Wav(#[from] hound::Error),

    #[error("failed to open audio device: {0}")]
    Device(String),

    #[error("audio source produced {0} NaN samples")]
    Nan(usize),

    #[error("malformed text signal dump: {0}")]
    TextFormat(String),
}

/// Errors a stage can raise while mutating the signal bag.
///
/// These are programmer errors (a pipeline misconfiguration), not runtime
/// conditions a caller is expected to recover from: a stage was wired up
/// without a prerequisite stage running first.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum StageError {
    #[error("stage '{stage}' requires signal '{signal}', which is missing from the bag")]
    MissingSignal { stage: &'static str, signal: &'static str },
}
