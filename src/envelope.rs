//! RMS / power envelope (C4): windowed mean-square of recent samples.
//!
//! Computed over the incoming chunk only, never the whole ring buffer, so
//! the segmenter below reacts to the current iteration's level rather than
//! to a smeared multi-second average.

use crate::bag::Bag;
use crate::error::StageError;
use crate::stage::Stage;

pub struct RmsEnvelope {
    /// Samples per sub-window. `None` treats the whole chunk as one window,
    /// producing a single-element `rms` vector.
    window_size: Option<usize>,
}

impl RmsEnvelope {
    pub fn new(window_size: Option<usize>) -> Self {
        Self { window_size }
    }
}

impl Default for RmsEnvelope {
    fn default() -> Self {
        Self::new(None)
    }
}

fn mean_square(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32
}

impl Stage for RmsEnvelope {
    fn name(&self) -> &'static str {
        "rms_envelope"
    }

    fn process(&mut self, bag: &mut Bag) -> Result<(), StageError> {
        if bag.source_signal.is_empty() {
            return Ok(());
        }

        let rms = match self.window_size {
            None => vec![mean_square(&bag.source_signal)],
            Some(window) if window == 0 => vec![mean_square(&bag.source_signal)],
            Some(window) => bag.source_signal.chunks(window).map(mean_square).collect(),
        };

        bag.rms = Some(rms);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn silence_is_zero() {
        let mut env = RmsEnvelope::default();
        let mut bag = Bag::new(0, 0, 44_100, vec![0.0; 100]);
        env.process(&mut bag).unwrap();
        assert_eq!(bag.rms.unwrap(), vec![0.0]);
    }

    #[test]
    fn monotone_in_amplitude() {
        let mut env = RmsEnvelope::default();

        let mut small = Bag::new(0, 0, 44_100, vec![0.1; 100]);
        env.process(&mut small).unwrap();

        let mut large = Bag::new(0, 0, 44_100, vec![0.5; 100]);
        env.process(&mut large).unwrap();

        assert!(large.rms.unwrap()[0] > small.rms.unwrap()[0]);
    }

    #[test]
    fn empty_chunk_adds_no_keys() {
        let mut env = RmsEnvelope::default();
        let mut bag = Bag::new(0, 0, 44_100, vec![]);
        env.process(&mut bag).unwrap();
        assert!(bag.rms.is_none());
    }
}
