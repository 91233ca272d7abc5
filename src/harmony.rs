//! Harmony / chroma analyzer (C8): per-semitone-class energy.
//!
//! Folds the spectrum into twelve pitch-class bins (chroma), ignoring
//! octave, by summing the magnitude at every bin whose frequency falls
//! within `+/- mask_width_semitones` of that semitone class in any octave
//! between `min_octave` and `max_octave`. A chord's semitone classes stand
//! out as the bins with both high absolute and high relative power,
//! independent of which octave each note was actually played in.

use rustfft::FftPlanner;

use crate::bag::Bag;
use crate::error::{ConfigError, StageError};
use crate::fft::{bin_to_freq_table, magnitude_spectrum};
use crate::pitch::{Pitch, SEMITONE_TO_NOTE};
use crate::stage::Stage;

pub const DEFAULT_FFT_RESOLUTION_HZ: f32 = 1.0;
pub const DEFAULT_MASK_WIDTH_SEMITONES: f32 = 0.1;
pub const DEFAULT_MIN_OCTAVE: i32 = 2;
pub const DEFAULT_MAX_OCTAVE: i32 = 6;
pub const DEFAULT_MIN_RELATIVE_POWER: f32 = 0.3;
pub const DEFAULT_MIN_ABSOLUTE_POWER: f32 = 50.0;

pub struct HarmonyAnalyzer {
    fft_size: usize,
    /// One bool mask per semitone class, indexed in parallel with the bin table.
    masks: [Vec<bool>; 12],
    min_octave: i32,
    min_relative_power: f32,
    min_absolute_power: f32,
    planner: FftPlanner<f32>,
}

impl HarmonyAnalyzer {
    pub fn new(sample_rate: u32, fft_resolution_hz: f32, mask_width_semitones: f32, min_octave: i32, max_octave: i32, min_relative_power: f32, min_absolute_power: f32) -> Result<Self, ConfigError> {
        if fft_resolution_hz <= 0.0 {
            return Err(ConfigError::NonPositiveFftSize(0));
        }
        let fft_size = (sample_rate as f32 / fft_resolution_hz) as usize;
        if fft_size == 0 {
            return Err(ConfigError::NonPositiveFftSize(fft_size as i64));
        }

        let idx_to_freq = bin_to_freq_table(fft_size, sample_rate);

        let masks: Vec<Vec<bool>> = (0..12)
            .map(|semitone| {
                idx_to_freq
                    .iter()
                    .map(|&freq| {
                        if freq <= 0.0 {
                            return false;
                        }
                        let offset = Pitch::new(freq).map(|p| p.offset_from_c0).unwrap_or(f32::NAN);
                        if offset.is_nan() {
                            return false;
                        }
                        (min_octave * 12..=(max_octave * 12 + 11)).any(|idx| idx.rem_euclid(12) == semitone as i32 && (offset - idx as f32).abs() <= mask_width_semitones)
                    })
                    .collect()
            })
            .collect();

        let masks: [Vec<bool>; 12] = masks.try_into().unwrap_or_else(|_| unreachable!());

        Ok(Self {
            fft_size,
            masks,
            min_octave,
            min_relative_power,
            min_absolute_power,
            planner: FftPlanner::new(),
        })
    }

    pub fn with_defaults(sample_rate: u32, fft_resolution_hz: f32) -> Result<Self, ConfigError> {
        Self::new(sample_rate, fft_resolution_hz, DEFAULT_MASK_WIDTH_SEMITONES, DEFAULT_MIN_OCTAVE, DEFAULT_MAX_OCTAVE, DEFAULT_MIN_RELATIVE_POWER, DEFAULT_MIN_ABSOLUTE_POWER)
    }
}

impl Stage for HarmonyAnalyzer {
    fn name(&self) -> &'static str {
        "harmony_analyzer"
    }

    fn process(&mut self, bag: &mut Bag) -> Result<(), StageError> {
        if bag.source_signal.is_empty() {
            return Ok(());
        }

        let spectrum_amp = magnitude_spectrum(&mut self.planner, &bag.source_signal, self.fft_size);

        let mut semitone_power = [0.0f32; 12];
        for (semitone, mask) in self.masks.iter().enumerate() {
            semitone_power[semitone] = mask.iter().zip(spectrum_amp.iter()).filter(|(&m, _)| m).map(|(_, &a)| a).sum();
        }

        let max_power = semitone_power.iter().cloned().fold(0.0f32, f32::max);
        let mut semitone_relative_power = [0.0f32; 12];
        if max_power > 0.0 {
            for i in 0..12 {
                semitone_relative_power[i] = semitone_power[i] / max_power;
            }
        }

        let powerful_semitones: Vec<Pitch> = (0..12)
            .filter(|&i| semitone_relative_power[i] >= self.min_relative_power && semitone_power[i] >= self.min_absolute_power)
            .filter_map(|i| Pitch::from_octave_semitone(self.min_octave, i as f32).ok())
            .collect();

        log::debug!(
            "harmony_analyzer: powerful semitones {:?}",
            powerful_semitones.iter().map(|p| SEMITONE_TO_NOTE[p.semitone as usize]).collect::<Vec<_>>()
        );

        bag.semitone_power = Some(semitone_power);
        bag.semitone_relative_power = Some(semitone_relative_power);
        bag.powerful_semitones = Some(powerful_semitones);

        Ok(())
    }
}
