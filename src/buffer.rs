//! Ring buffer (C3): accumulates the last `duration` seconds of samples.
//!
//! Grounded in the original's `Buffer.process`: append the new chunk, and if
//! the accumulated length exceeds `buffer_len`, drop the oldest `overflow`
//! samples and advance `buffered_signal_start` by the same amount so it
//! always names the absolute sample index of the oldest stored sample.

use crate::bag::Bag;
use crate::error::StageError;
use crate::stage::Stage;

pub struct RingBuffer {
    buffer_len: usize,
    buffered_signal: Vec<f32>,
    buffered_signal_start: u64,
}

impl RingBuffer {
    /// `duration` is in seconds; the buffer holds `floor(duration * sample_rate)` samples.
    pub fn new(sample_rate: u32, duration: f32) -> Self {
        let buffer_len = (duration * sample_rate as f32).floor() as usize;
        Self {
            buffer_len,
            buffered_signal: Vec::with_capacity(buffer_len),
            buffered_signal_start: 0,
        }
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer_len
    }
}

impl Stage for RingBuffer {
    fn name(&self) -> &'static str {
        "ring_buffer"
    }

    fn process(&mut self, bag: &mut Bag) -> Result<(), StageError> {
        if bag.source_signal.is_empty() {
            log::warn!("ring_buffer: empty source signal, skipping");
            return Ok(());
        }

        self.buffered_signal.extend_from_slice(&bag.source_signal);

        let overflow = self.buffered_signal.len().saturating_sub(self.buffer_len);
        if overflow > 0 {
            self.buffered_signal.drain(0..overflow);
            self.buffered_signal_start += overflow as u64;
        }

        bag.buffered_signal = Some(self.buffered_signal.clone());
        bag.buffered_signal_start = Some(self.buffered_signal_start);

        Ok(())
    }
}
