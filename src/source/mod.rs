//! Audio sources (C12): everything the driver reads sample chunks from.

mod synth;
mod wav;

#[cfg(feature = "soundcard")]
mod soundcard;

pub use synth::{Fade, GeneratedSource, Synthesizer, GUITAR_TIMBRE, ZERO_TIMBRE};
pub use wav::WavSource;

#[cfg(feature = "soundcard")]
pub use soundcard::SoundCardSource;

use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::error::SourceError;

/// A source of audio samples, read in fixed-size chunks.
///
/// `read` is the only method in the whole pipeline allowed to block: every
/// other stage runs purely on the chunk it's handed. A source that has no
/// more data returns an empty `Vec` rather than blocking forever; the driver
/// treats that as end of stream.
pub trait AudioSource {
    /// Sample rate of the audio this source produces.
    fn sample_rate(&self) -> u32;

    /// Reads up to `chunk_size` samples. Returns fewer (including zero) at
    /// end of stream; callers should stop driving the pipeline once an empty
    /// chunk comes back.
    fn read(&mut self, chunk_size: usize) -> Result<Vec<f32>, SourceError>;
}

impl AudioSource for Box<dyn AudioSource> {
    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }

    fn read(&mut self, chunk_size: usize) -> Result<Vec<f32>, SourceError> {
        (**self).read(chunk_size)
    }
}

/// Dumps a signal as text: the sample rate on the first line, then one
/// sample per line. An unofficial companion to the WAV format, handy for
/// inspecting a signal by eye or diffing two runs.
pub fn dump_signal_text<P: AsRef<Path>>(path: P, sample_rate: u32, samples: &[f32]) -> Result<(), SourceError> {
    let mut file = std::fs::File::create(path)?;
    writeln!(file, "{sample_rate}")?;
    for &sample in samples {
        writeln!(file, "{sample}")?;
    }
    log::info!("dump_signal_text: wrote {} samples", samples.len());
    Ok(())
}

/// Loads a signal dumped by [`dump_signal_text`].
pub fn load_signal_text<P: AsRef<Path>>(path: P) -> Result<(u32, Vec<f32>), SourceError> {
    let file = std::fs::File::open(path)?;
    let mut lines = BufReader::new(file).lines();

    let sample_rate = lines
        .next()
        .ok_or_else(|| SourceError::TextFormat("empty file, expected a sample rate line".to_string()))??
        .trim()
        .parse::<u32>()
        .map_err(|e| SourceError::TextFormat(format!("invalid sample rate: {e}")))?;

    let samples = lines
        .map(|line| {
            let line = line?;
            line.trim().parse::<f32>().map_err(|e| SourceError::TextFormat(format!("invalid sample '{line}': {e}")))
        })
        .collect::<Result<Vec<f32>, SourceError>>()?;

    log::info!("load_signal_text: loaded {} samples", samples.len());
    Ok((sample_rate, samples))
}
