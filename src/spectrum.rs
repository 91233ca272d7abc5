//! Spectrum analyzer (C6): windowed FFT with a target frequency resolution,
//! returning peaks gated by both a relative (to the spectral max) and an
//! absolute (per-input-sample) height, restricted to a configurable pitch
//! band.
//!
//! The dual gate exists because either one alone is fooled in a different
//! regime: a pure relative gate always finds *a* peak even in silence (the
//! noise floor has a max too); a pure absolute gate needs hand-tuning per
//! input level and breaks as soon as harmonics dominate the fundamental.

use rustfft::FftPlanner;

use crate::bag::Bag;
use crate::error::{ConfigError, StageError};
use crate::fft::{bin_to_freq_table, complex_spectrum, find_peaks};
use crate::pitch::Pitch;
use crate::stage::Stage;

pub const DEFAULT_FFT_RESOLUTION_HZ: f32 = 0.25;
pub const DEFAULT_MIN_RELATIVE_PEAK_HEIGHT: f32 = 1.0 / 3.0;
pub const DEFAULT_MIN_ABSOLUTE_PEAK_HEIGHT: f32 = 0.001;

pub struct SpectrumAnalyzer {
    sample_rate: u32,
    fft_size: usize,
    min_relative_peak_height: f32,
    min_absolute_peak_height: f32,
    min_freq: f32,
    max_freq: f32,
    idx_to_freq: Vec<f32>,
    planner: FftPlanner<f32>,
}

impl SpectrumAnalyzer {
    pub fn new(sample_rate: u32, fft_resolution_hz: f32, min_freq: f32, max_freq: f32, min_relative_peak_height: f32, min_absolute_peak_height: f32) -> Result<Self, ConfigError> {
        if fft_resolution_hz <= 0.0 {
            return Err(ConfigError::NonPositiveFftSize(0));
        }
        let fft_size = (sample_rate as f32 / fft_resolution_hz) as usize;
        if fft_size == 0 {
            return Err(ConfigError::NonPositiveFftSize(fft_size as i64));
        }
        if min_freq >= max_freq {
            return Err(ConfigError::InvalidBand { low: min_freq, high: max_freq });
        }

        let idx_to_freq = bin_to_freq_table(fft_size, sample_rate);

        Ok(Self {
            sample_rate,
            fft_size,
            min_relative_peak_height,
            min_absolute_peak_height,
            min_freq,
            max_freq,
            idx_to_freq,
            planner: FftPlanner::new(),
        })
    }

    /// Builds an analyzer with the default resolution and D2..F6 pitch band.
    pub fn with_defaults(sample_rate: u32) -> Result<Self, ConfigError> {
        let min_freq = Pitch::parse("D2").unwrap().frequency;
        let max_freq = Pitch::parse("F6").unwrap().frequency;
        Self::new(sample_rate, DEFAULT_FFT_RESOLUTION_HZ, min_freq, max_freq, DEFAULT_MIN_RELATIVE_PEAK_HEIGHT, DEFAULT_MIN_ABSOLUTE_PEAK_HEIGHT)
    }
}

impl Stage for SpectrumAnalyzer {
    fn name(&self) -> &'static str {
        "spectrum_analyzer"
    }

    fn process(&mut self, bag: &mut Bag) -> Result<(), StageError> {
        if bag.source_signal.is_empty() {
            return Ok(());
        }

        debug_assert_eq!(bag.sample_rate, self.sample_rate);

        let spectrum = complex_spectrum(&mut self.planner, &bag.source_signal, self.fft_size);
        let spectrum_amp: Vec<f32> = spectrum.iter().map(|c| c.norm()).collect();

        let max_amp = spectrum_amp.iter().cloned().fold(0.0f32, f32::max);
        let min_peak_height = (max_amp * self.min_relative_peak_height).max(bag.source_signal.len() as f32 * self.min_absolute_peak_height);

        let mut peaks_idx = find_peaks(&spectrum_amp, min_peak_height);
        // Only the positive half of the spectrum, within the configured band.
        peaks_idx.retain(|&i| {
            let freq = self.idx_to_freq[i];
            freq >= 0.0 && freq >= self.min_freq && freq <= self.max_freq
        });

        let peaks_freq: Vec<f32> = peaks_idx.iter().map(|&i| self.idx_to_freq[i]).collect();
        let pitches: Vec<Pitch> = peaks_freq.iter().filter_map(|&f| Pitch::new(f).ok()).collect();

        log::debug!("spectrum_analyzer: {} peaks, {} pitches", peaks_idx.len(), pitches.len());

        bag.spectrum = Some(spectrum);
        bag.spectrum_amp = Some(spectrum_amp);
        bag.spectrum_peaks_idx = Some(peaks_idx);
        bag.spectrum_peaks_freq = Some(peaks_freq);
        bag.pitches = Some(pitches);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use std::f32::consts::PI;

    use super::*;

    fn sine(freq: f32, sample_rate: u32, n: usize) -> Vec<f32> {
        (0..n).map(|i| (2.0 * PI * freq * i as f32 / sample_rate as f32).sin()).collect()
    }

    #[test]
    fn finds_pure_tone_pitch() {
        let sample_rate = 8_000;
        let mut analyzer = SpectrumAnalyzer::new(sample_rate, 4.0, 100.0, 1_000.0, 1.0 / 3.0, 0.0).unwrap();
        let signal = sine(440.0, sample_rate, 2_000);

        let mut bag = Bag::new(0, 0, sample_rate, signal);
        analyzer.process(&mut bag).unwrap();

        let freqs = bag.spectrum_peaks_freq.unwrap();
        assert!(!freqs.is_empty());
        assert!(freqs.iter().any(|f| (f - 440.0).abs() < 4.0), "{freqs:?}");
    }

    #[test]
    fn peaks_stay_within_configured_band() {
        let sample_rate = 8_000;
        let mut analyzer = SpectrumAnalyzer::new(sample_rate, 4.0, 200.0, 300.0, 1.0 / 3.0, 0.0).unwrap();
        let signal = sine(440.0, sample_rate, 2_000);

        let mut bag = Bag::new(0, 0, sample_rate, signal);
        analyzer.process(&mut bag).unwrap();

        for f in bag.spectrum_peaks_freq.unwrap() {
            assert!((200.0..=300.0).contains(&f));
        }
    }

    #[test]
    fn rejects_bad_band() {
        assert!(SpectrumAnalyzer::new(8_000, 1.0, 500.0, 100.0, 0.3, 0.0).is_err());
    }

    #[test]
    fn populates_complex_spectrum_consistent_with_magnitude() {
        let sample_rate = 8_000;
        let mut analyzer = SpectrumAnalyzer::new(sample_rate, 4.0, 100.0, 1_000.0, 1.0 / 3.0, 0.0).unwrap();
        let signal = sine(440.0, sample_rate, 2_000);

        let mut bag = Bag::new(0, 0, sample_rate, signal);
        analyzer.process(&mut bag).unwrap();

        let spectrum = bag.spectrum.unwrap();
        let spectrum_amp = bag.spectrum_amp.unwrap();
        assert_eq!(spectrum.len(), spectrum_amp.len());
        for (c, &amp) in spectrum.iter().zip(spectrum_amp.iter()) {
            assert!((c.norm() - amp).abs() < 1e-4);
        }
    }

    #[test]
    fn empty_chunk_adds_no_keys() {
        let mut analyzer = SpectrumAnalyzer::with_defaults(44_100).unwrap();
        let mut bag = Bag::new(0, 0, 44_100, vec![]);
        analyzer.process(&mut bag).unwrap();
        assert!(bag.pitches.is_none());
    }
}
