//! Note tracker (C10): turns finished pitch tracks into [`Note`]s, optionally
//! refining each note's frequency with a high-resolution DFT over a slice of
//! its buffered signal.
//!
//! The coarse per-iteration pitch estimate comes from whatever FFT
//! resolution the spectrum analyzer runs at every iteration (fast, but
//! coarse in frequency). Once a note is known to have finished, there's no
//! more hurry: a single much higher-resolution DFT, run once over the whole
//! held note, pins down its frequency far more precisely than the per-frame
//! estimate could. The slice taken is the buffer's middle third minus a
//! sixth on each side (`len/6..4*len/6`): it skips the attack transient at
//! the start and the release at the end, where the frequency estimate is
//! least reliable.

use rustfft::FftPlanner;

use crate::bag::Bag;
use crate::error::StageError;
use crate::fft::{bin_to_freq_table, magnitude_spectrum};
use crate::note::Note;
use crate::pitch::Pitch;
use crate::stage::Stage;

pub const DEFAULT_BPM: f32 = 60.0;
pub const DEFAULT_RESOLUTION_BEAT: f32 = 1.0 / 4.0;
pub const DEFAULT_FFT_RESOLUTION_HZ: f32 = 0.05;
pub const DEFAULT_SEARCH_WIN_SIZE_HZ: f32 = 2.0;
pub const DEFAULT_USE_LONG_FFT_OPTIMIZATION: bool = true;

pub struct NoteTracker {
    bpm: f32,
    resolution_beat: f32,
    fft_resolution_hz: f32,
    search_win_size_hz: f32,
    use_long_fft_optimization: bool,
    planner: FftPlanner<f32>,
}

impl NoteTracker {
    pub fn new(bpm: f32, resolution_beat: f32, fft_resolution_hz: f32, search_win_size_hz: f32, use_long_fft_optimization: bool) -> Self {
        Self {
            bpm,
            resolution_beat,
            fft_resolution_hz,
            search_win_size_hz,
            use_long_fft_optimization,
            planner: FftPlanner::new(),
        }
    }

    /// Re-estimates `note`'s frequency from a high-resolution DFT over the
    /// held portion of `buffered_signal`, searching only within
    /// `search_win_size_hz` of the note's coarse frequency.
    fn long_dft_optimization(&mut self, note: &Note, start: u64, current_sample: u64, sample_rate: u32, buffered_signal: &[f32], buffered_signal_start: u64) -> Note {
        let buffer_start = start.saturating_sub(buffered_signal_start) as usize;
        let buffer_chunk_full = &buffered_signal[buffer_start.min(buffered_signal.len())..];

        let len = buffer_chunk_full.len();
        let buffer_chunk = &buffer_chunk_full[len / 6..(4 * len / 6).max(len / 6)];

        let fft_size = ((sample_rate as f32 / self.fft_resolution_hz) as usize).max(buffer_chunk.len());
        if fft_size == 0 || buffer_chunk.is_empty() {
            return *note;
        }

        log::info!("note_tracker: optimizing on {} samples with fft size {fft_size}", buffer_chunk.len());

        let idx_to_freq = bin_to_freq_table(fft_size, sample_rate);
        let spectrum_amp = magnitude_spectrum(&mut self.planner, buffer_chunk, fft_size);

        let search_idx: Vec<usize> = (0..idx_to_freq.len()).filter(|&i| (idx_to_freq[i] - note.pitch.frequency).abs() < self.search_win_size_hz).collect();

        let (search_win_min, search_win_max) = match (search_idx.iter().min(), search_idx.iter().max()) {
            (Some(&lo), Some(&hi)) => (lo, hi),
            _ => return *note,
        };

        let best = spectrum_amp[search_win_min..search_win_max].iter().enumerate().max_by(|a, b| a.1.partial_cmp(b.1).unwrap());
        let Some((offset, _)) = best else {
            return *note;
        };
        let max_freq = idx_to_freq[search_win_min + offset];

        match Pitch::new(max_freq) {
            Ok(pitch) => Note::new(pitch, note.start_s, note.end_s, Some(self.bpm)),
            Err(_) => {
                log::warn!("note_tracker: long DFT produced invalid frequency {max_freq}, keeping coarse estimate");
                *note
            }
        }
    }
}

impl Default for NoteTracker {
    fn default() -> Self {
        Self::new(DEFAULT_BPM, DEFAULT_RESOLUTION_BEAT, DEFAULT_FFT_RESOLUTION_HZ, DEFAULT_SEARCH_WIN_SIZE_HZ, DEFAULT_USE_LONG_FFT_OPTIMIZATION)
    }
}

impl Stage for NoteTracker {
    fn name(&self) -> &'static str {
        "note_tracker"
    }

    fn process(&mut self, bag: &mut Bag) -> Result<(), StageError> {
        let finished = match &bag.finished_pitches {
            Some(f) if !f.is_empty() => f.clone(),
            _ => return Ok(()),
        };

        let mut notes = Vec::with_capacity(finished.len());

        for (pitch, start) in finished {
            let note = Note::new(pitch, start as f32 / bag.sample_rate as f32, bag.current_sample as f32 / bag.sample_rate as f32, Some(self.bpm));

            if note.value.unwrap_or(0.0) <= self.resolution_beat {
                continue;
            }

            let note = if self.use_long_fft_optimization {
                match (&bag.buffered_signal, bag.buffered_signal_start) {
                    (Some(buffered_signal), Some(buffered_signal_start)) => self.long_dft_optimization(&note, start, bag.current_sample, bag.sample_rate, buffered_signal, buffered_signal_start),
                    _ => {
                        log::warn!("note_tracker: no buffered_signal, can't optimize note");
                        note
                    }
                }
            } else {
                note
            };

            notes.push(note);
        }

        bag.notes = notes;
        Ok(())
    }
}
