//! Sound segmenter (C5): rising/falling-edge detector on RMS power.
//!
//! State machine with states `{idle, sounding}`. Debounces short blips: a
//! region is only emitted once it has lasted at least `min_sound_duration`
//! seconds; shorter ones are silently dropped when the signal falls back
//! below the noise floor.

use crate::bag::Bag;
use crate::error::StageError;
use crate::stage::Stage;

pub const DEFAULT_MIN_NOISE_POWER: f32 = 0.01;
pub const DEFAULT_MIN_SOUND_DURATION: f32 = 0.5;

pub struct SoundSegmenter {
    min_noise_power: f32,
    min_sound_duration: f32,
    sound_start: Option<u64>,
}

impl SoundSegmenter {
    pub fn new(min_noise_power: f32, min_sound_duration: f32) -> Self {
        Self {
            min_noise_power,
            min_sound_duration,
            sound_start: None,
        }
    }
}

impl Default for SoundSegmenter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_NOISE_POWER, DEFAULT_MIN_SOUND_DURATION)
    }
}

impl Stage for SoundSegmenter {
    fn name(&self) -> &'static str {
        "sound_segmenter"
    }

    fn process(&mut self, bag: &mut Bag) -> Result<(), StageError> {
        if bag.source_signal.is_empty() {
            return Ok(());
        }

        let rms = bag.rms.as_ref().ok_or(StageError::MissingSignal {
            stage: "sound_segmenter",
            signal: "rms",
        })?;
        let buffered_signal = bag.buffered_signal.as_ref().ok_or(StageError::MissingSignal {
            stage: "sound_segmenter",
            signal: "buffered_signal",
        })?;
        let buffered_signal_start = bag.buffered_signal_start.ok_or(StageError::MissingSignal {
            stage: "sound_segmenter",
            signal: "buffered_signal_start",
        })?;

        let power = rms.iter().sum::<f32>() / rms.len() as f32;
        log::debug!("sound_segmenter: power={power}");

        if power > self.min_noise_power {
            if self.sound_start.is_none() {
                self.sound_start = Some(bag.current_sample);
                log::info!("sound_segmenter: idle -> sounding at sample {}", bag.current_sample);
            }
        } else if let Some(sound_start) = self.sound_start {
            let n_samples = bag.current_sample - sound_start;
            let duration = n_samples as f32 / bag.sample_rate as f32;
            if duration >= self.min_sound_duration {
                bag.sounds_split_points.push((sound_start, bag.current_sample));
                let offset = (sound_start - buffered_signal_start) as usize;
                bag.split_sound = Some(buffered_signal[offset.min(buffered_signal.len())..].to_vec());
                log::info!("sound_segmenter: sounding -> idle, emitted region [{sound_start}, {}) ({duration}s)", bag.current_sample);
            } else {
                log::debug!("sound_segmenter: debounced region of {duration}s (< {})", self.min_sound_duration);
            }
            self.sound_start = None;
        }

        Ok(())
    }
}
