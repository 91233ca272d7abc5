//! Band peak finder (C7): fixed-band tuner mode.
//!
//! Unlike the general spectrum analyzer, this stage never searches the whole
//! spectrum: each band's bin-index range is precomputed once at construction
//! time, and every iteration just takes the argmax magnitude within each
//! range. Used by the `tune` CLI mode, where the set of candidate pitches is
//! known in advance (e.g. the six open strings of a guitar) and hunting the
//! full spectrum for peaks would find the wrong string's harmonic.

use rustfft::FftPlanner;

use crate::bag::Bag;
use crate::error::{ConfigError, StageError};
use crate::fft::{bin_to_freq_table, magnitude_spectrum};
use crate::pitch::Pitch;
use crate::stage::Stage;

/// Half-width, in semitones, of each band around its center pitch.
pub const DEFAULT_BAND_HALF_WIDTH_SEMITONES: f32 = 1.5;
/// Target FFT frequency resolution, in Hz, the way `SpectrumAnalyzer` takes one.
pub const DEFAULT_FFT_RESOLUTION_HZ: f32 = 0.1;
/// Noise floor below which a band's argmax is reported as no peak, scaled by
/// the input length the same way `spectrum.rs`'s absolute gate is.
pub const DEFAULT_MIN_ABSOLUTE_PEAK_HEIGHT: f32 = 0.0005;

/// The six open strings of a standard-tuned guitar, low to high.
pub const GUITAR_STRINGS: [&str; 6] = ["E2", "A2", "D3", "G3", "B3", "E4"];

struct Band {
    center_freq: f32,
    bin_lo: usize,
    bin_hi: usize,
}

pub struct BandPeakFinder {
    fft_size: usize,
    min_absolute_peak_height: f32,
    idx_to_freq: Vec<f32>,
    bands: Vec<Band>,
    planner: FftPlanner<f32>,
}

impl BandPeakFinder {
    /// Builds a band finder for `centers` (Hz), each spanning
    /// `+/- half_width_semitones` around its center. `fft_resolution_hz`
    /// sets the FFT size the same way `SpectrumAnalyzer::new` does.
    pub fn new(sample_rate: u32, fft_resolution_hz: f32, centers: &[f32], half_width_semitones: f32, min_absolute_peak_height: f32) -> Result<Self, ConfigError> {
        if fft_resolution_hz <= 0.0 {
            return Err(ConfigError::NonPositiveFftSize(0));
        }
        let fft_size = (sample_rate as f32 / fft_resolution_hz) as usize;
        if fft_size == 0 {
            return Err(ConfigError::NonPositiveFftSize(fft_size as i64));
        }

        let idx_to_freq = bin_to_freq_table(fft_size, sample_rate);
        let mut bands = Vec::with_capacity(centers.len());

        for &center_freq in centers {
            let center = Pitch::new(center_freq)?;
            let lo_freq = Pitch::frequency_from_octave_semitone(0, center.offset_from_c0 - half_width_semitones);
            let hi_freq = Pitch::frequency_from_octave_semitone(0, center.offset_from_c0 + half_width_semitones);

            let bin_lo = idx_to_freq.iter().position(|&f| f >= lo_freq).unwrap_or(idx_to_freq.len());
            let bin_hi = idx_to_freq.iter().position(|&f| f > hi_freq).unwrap_or(idx_to_freq.len());

            bands.push(Band { center_freq, bin_lo, bin_hi: bin_hi.max(bin_lo) });
        }

        Ok(Self {
            fft_size,
            min_absolute_peak_height,
            idx_to_freq,
            bands,
            planner: FftPlanner::new(),
        })
    }

    /// Builds a band finder over the six standard guitar strings, at the
    /// default resolution and noise floor.
    pub fn guitar_tuner(sample_rate: u32, fft_resolution_hz: f32) -> Result<Self, ConfigError> {
        let centers: Vec<f32> = GUITAR_STRINGS.iter().map(|s| Pitch::parse(s).unwrap().frequency).collect();
        Self::new(sample_rate, fft_resolution_hz, &centers, DEFAULT_BAND_HALF_WIDTH_SEMITONES, DEFAULT_MIN_ABSOLUTE_PEAK_HEIGHT)
    }
}

impl Stage for BandPeakFinder {
    fn name(&self) -> &'static str {
        "band_peak_finder"
    }

    fn process(&mut self, bag: &mut Bag) -> Result<(), StageError> {
        if bag.source_signal.is_empty() {
            return Ok(());
        }

        let spectrum_amp = magnitude_spectrum(&mut self.planner, &bag.source_signal, self.fft_size);

        let peaks: Vec<Option<f32>> = self
            .bands
            .iter()
            .map(|band| {
                if band.bin_lo >= band.bin_hi {
                    return None;
                }
                let (best_idx, &best_amp) = spectrum_amp[band.bin_lo..band.bin_hi].iter().enumerate().max_by(|a, b| a.1.partial_cmp(b.1).unwrap())?;
                if best_amp < bag.source_signal.len() as f32 * self.min_absolute_peak_height {
                    return None;
                }
                log::trace!("band_peak_finder: center {:.2}Hz -> peak {:.2}Hz", band.center_freq, self.idx_to_freq[band.bin_lo + best_idx]);
                Some(self.idx_to_freq[band.bin_lo + best_idx])
            })
            .collect();

        bag.bands_peak = Some(peaks);
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
    fn guitar_tuner_has_six_bands() {
        let finder = BandPeakFinder::guitar_tuner(8_000, 2.0).unwrap();
        assert_eq!(finder.bands.len(), 6);
    }

    #[test]
    fn finds_peak_near_matching_string() {
        let sample_rate = 8_000;
        let fft_resolution_hz = 1.0;
        let fft_size = (sample_rate as f32 / fft_resolution_hz) as usize;
        let mut finder = BandPeakFinder::guitar_tuner(sample_rate, fft_resolution_hz).unwrap();

        let e2 = Pitch::parse("E2").unwrap().frequency;
        let mut bag = Bag::new(0, 0, sample_rate, sine(e2, sample_rate, fft_size));
        finder.process(&mut bag).unwrap();

        let peaks = bag.bands_peak.unwrap();
        let e2_peak = peaks[0].expect("E2 band should have a peak");
        assert!((e2_peak - e2).abs() < 2.0, "got {e2_peak}");
        assert!(peaks[1].map_or(true, |f| (f - e2).abs() > 5.0));
    }

    #[test]
    fn silence_yields_no_peaks() {
        let sample_rate = 8_000;
        let mut finder = BandPeakFinder::guitar_tuner(sample_rate, 2.0).unwrap();
        let mut bag = Bag::new(0, 0, sample_rate, vec![0.0; 4_000]);
        finder.process(&mut bag).unwrap();
        assert!(bag.bands_peak.unwrap().iter().all(|p| p.is_none()));
    }

    #[test]
    fn quiet_peak_below_absolute_floor_is_suppressed() {
        let sample_rate = 8_000;
        let fft_resolution_hz = 1.0;
        let fft_size = (sample_rate as f32 / fft_resolution_hz) as usize;
        let mut finder = BandPeakFinder::guitar_tuner(sample_rate, fft_resolution_hz).unwrap();

        let e2 = Pitch::parse("E2").unwrap().frequency;
        let quiet_signal: Vec<f32> = sine(e2, sample_rate, fft_size).iter().map(|s| s * 1e-6).collect();
        let mut bag = Bag::new(0, 0, sample_rate, quiet_signal);
        finder.process(&mut bag).unwrap();

        assert!(bag.bands_peak.unwrap()[0].is_none());
    }
}
