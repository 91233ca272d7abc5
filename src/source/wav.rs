//! WAV-file audio source, backed by `hound`.

use std::path::Path;

use super::AudioSource;
use crate::error::SourceError;

pub struct WavSource {
    sample_rate: u32,
    samples: Vec<f32>,
    cursor: usize,
}

impl WavSource {
    /// Opens `path` and decodes it to mono `f32` samples in `[-1.0, 1.0]`,
    /// averaging channels down if the file is multi-channel.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();

        let raw: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
            hound::SampleFormat::Int => match spec.bits_per_sample {
                16 => reader.samples::<i16>().map(|s| s.map(|v| v as f32 / i16::MAX as f32)).collect::<Result<_, _>>()?,
                24 | 32 => reader.samples::<i32>().map(|s| s.map(|v| v as f32 / (1i64 << (spec.bits_per_sample - 1)) as f32)).collect::<Result<_, _>>()?,
                bits => return Err(SourceError::Device(format!("unsupported WAV bit depth: {bits}"))),
            },
        };

        let channels = spec.channels as usize;
        let samples = if channels <= 1 {
            raw
        } else {
            raw.chunks(channels).map(|frame| frame.iter().sum::<f32>() / channels as f32).collect()
        };

        Ok(Self {
            sample_rate: spec.sample_rate,
            samples,
            cursor: 0,
        })
    }
}

impl AudioSource for WavSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read(&mut self, chunk_size: usize) -> Result<Vec<f32>, SourceError> {
        let end = (self.cursor + chunk_size).min(self.samples.len());
        let chunk = self.samples[self.cursor..end].to_vec();
        self.cursor = end;
        Ok(chunk)
    }
}
