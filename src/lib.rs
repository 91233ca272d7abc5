//! Real-time pitch and note transcription: a single-threaded pipeline of
//! stateful stages (ring buffer, envelope, segmenter, spectrum/band/harmony
//! analyzers, pitch/note trackers) driven by an [`AudioSource`] and
//! observed by an [`OutputSink`].
//!
//! See [`driver::Driver`] for the loop that ties everything together.

pub mod bag;
pub mod bands;
pub mod buffer;
pub mod driver;
pub mod envelope;
pub mod error;
pub mod fft;
pub mod harmony;
pub mod note;
pub mod pitch;
pub mod segmenter;
pub mod sink;
pub mod source;
pub mod spectrum;
pub mod stage;
pub mod tracker;

#[cfg(feature = "config")]
pub mod config;

pub use bag::Bag;
pub use driver::Driver;
pub use error::{ConfigError, Res, SourceError, StageError};
pub use note::Note;
pub use pitch::Pitch;
pub use sink::OutputSink;
pub use source::AudioSource;
pub use stage::Stage;
