//! Synthesizer-backed audio source: renders a whitespace-separated melody
//! string into a sample buffer at construction, then serves it out in
//! fixed-size chunks like any other source.

use std::f32::consts::PI;

use super::AudioSource;
use crate::error::SourceError;
use crate::pitch::Pitch;

/// Overtone (ratio to the fundamental, amplitude) pairs added on top of the
/// fundamental sine before normalization.
pub type Timbre = Vec<(f32, f32)>;

pub fn zero_timbre() -> Timbre {
    Vec::new()
}

/// Mirrors a plucked string: a sharp second harmonic, a softer third, a
/// faint fourth.
pub const GUITAR_TIMBRE: [(f32, f32); 3] = [(2.0, 1.1), (1.5, 0.4), (4.0, 0.1)];

pub const ZERO_TIMBRE: [(f32, f32); 0] = [];

pub const DEFAULT_FADE_IN_S: f32 = 0.01;
pub const DEFAULT_FADE_OUT_S: f32 = 0.01;

/// Linear fade-in/fade-out envelope applied to a generated note.
#[derive(Debug, Clone, Copy)]
pub struct Fade {
    pub fade_in_s: f32,
    pub fade_out_s: f32,
}

impl Default for Fade {
    fn default() -> Self {
        Self {
            fade_in_s: DEFAULT_FADE_IN_S,
            fade_out_s: DEFAULT_FADE_OUT_S,
        }
    }
}

/// Renders sine-based notes and melodies at a fixed sample rate and tempo.
pub struct Synthesizer {
    sample_rate: u32,
    beat_bpm: f32,
    default_timbre: Timbre,
}

impl Synthesizer {
    pub fn new(sample_rate: u32, beat_bpm: f32, default_timbre: Timbre) -> Self {
        Self { sample_rate, beat_bpm, default_timbre }
    }

    fn value_to_duration(&self, value: f32) -> f32 {
        value * 4.0 * 60.0 / self.beat_bpm
    }

    fn generate_sin(&self, amp: f32, freq: f32, duration_samples: usize) -> Vec<f32> {
        (0..duration_samples).map(|i| amp * (2.0 * PI * freq * i as f32 / self.sample_rate as f32).sin()).collect()
    }

    fn generate_fade(&self, duration_samples: usize, fade: Fade) -> Result<Vec<f32>, SourceError> {
        let fade_in_len = if fade.fade_in_s > 0.0 { (fade.fade_in_s * self.sample_rate as f32) as usize } else { 0 };
        let fade_out_len = if fade.fade_out_s > 0.0 { (fade.fade_out_s * self.sample_rate as f32) as usize } else { 0 };

        if duration_samples <= fade_in_len + fade_out_len {
            return Err(SourceError::Device("fade is too long for the note duration".into()));
        }

        let mut envelope = Vec::with_capacity(duration_samples);
        for i in 0..fade_in_len {
            envelope.push(i as f32 / fade_in_len as f32);
        }
        let sustain_len = duration_samples - fade_in_len - fade_out_len;
        envelope.extend(std::iter::repeat(1.0f32).take(sustain_len));
        for i in 0..fade_out_len {
            envelope.push(1.0 - i as f32 / fade_out_len as f32);
        }

        Ok(envelope)
    }

    /// Scales `signal` into `[-1.0, 1.0]`. A constant (silent) signal is
    /// returned unchanged, with a warning, since peak-to-peak is zero.
    fn normalize(signal: &[f32]) -> Vec<f32> {
        let min = signal.iter().cloned().fold(f32::INFINITY, f32::min);
        let max = signal.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let ptp = max - min;

        if ptp > 1e-6 {
            signal.iter().map(|&s| (s - min) * 2.0 / ptp - 1.0).collect()
        } else {
            log::warn!("synthesizer: normalize does not work with a constant audio signal");
            signal.to_vec()
        }
    }

    /// Generates a single note: fundamental plus timbre overtones, normalized
    /// and enveloped.
    pub fn generate_note(&self, amp: f32, freq: f32, value: f32, timbre: &[(f32, f32)], fade: Fade) -> Result<Vec<f32>, SourceError> {
        let duration_s = self.value_to_duration(value);
        let duration_samples = (duration_s * self.sample_rate as f32) as usize;

        let mut signal = self.generate_sin(1.0, freq, duration_samples);
        for &(overtone, overtone_amp) in timbre {
            let overtone_signal = self.generate_sin(overtone_amp, freq * overtone, duration_samples);
            for (s, o) in signal.iter_mut().zip(overtone_signal) {
                *s += o;
            }
        }

        let normalized = Self::normalize(&signal);
        let envelope = self.generate_fade(duration_samples, fade)?;

        Ok(normalized.into_iter().zip(envelope).map(|(s, e)| amp * s * e).collect())
    }

    /// Generates a melody from `(amplitude, frequency, value_in_beats)` notes.
    pub fn generate_melody(&self, notes: &[(f32, f32, f32)], timbre: &[(f32, f32)], fade: Fade) -> Result<Vec<f32>, SourceError> {
        let mut signal = Vec::new();
        for &(amp, freq, value) in notes {
            signal.extend(self.generate_note(amp, freq, value, timbre, fade)?);
        }
        Ok(signal)
    }

    /// Parses a melody string (whitespace-separated note literals matching
    /// `[A-G][#b]?[0-9]?`; unparseable tokens are skipped) and renders it.
    /// Every note is rendered at amplitude 0.5 and a quarter-beat value.
    pub fn parse_and_generate_melody(&self, melody: &str, timbre: &[(f32, f32)], fade: Fade) -> Result<Vec<f32>, SourceError> {
        let notes: Vec<(f32, f32, f32)> = melody
            .split_whitespace()
            .filter_map(|token| Pitch::parse(token).ok())
            .map(|pitch| (0.5, pitch.frequency, 1.0 / 4.0))
            .collect();
        self.generate_melody(&notes, timbre, fade)
    }
}

/// An [`AudioSource`] that renders a melody string once, up front, then
/// serves it back in fixed-size chunks.
pub struct GeneratedSource {
    sample_rate: u32,
    chunk_size: usize,
    signal: Vec<f32>,
    cursor: usize,
}

impl GeneratedSource {
    pub fn from_melody(sample_rate: u32, processing_rate: f32, beat_bpm: f32, melody: &str, timbre: &[(f32, f32)], fade: Fade) -> Result<Self, SourceError> {
        let synthesizer = Synthesizer::new(sample_rate, beat_bpm, timbre.to_vec());
        let signal = synthesizer.parse_and_generate_melody(melody, timbre, fade)?;
        let chunk_size = (sample_rate as f32 / processing_rate) as usize;

        Ok(Self {
            sample_rate,
            chunk_size: chunk_size.max(1),
            signal,
            cursor: 0,
        })
    }
}

impl AudioSource for GeneratedSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read(&mut self, _chunk_size: usize) -> Result<Vec<f32>, SourceError> {
        let end = (self.cursor + self.chunk_size).min(self.signal.len());
        let chunk = self.signal[self.cursor..end].to_vec();
        self.cursor = end;
        Ok(chunk)
    }
}
