//! Pitch and note tracking (C9, C10): turns per-frame pitch detections into
//! continuous note events.

mod note_tracker;
mod pitch_tracker;

pub use note_tracker::{NoteTracker, DEFAULT_FFT_RESOLUTION_HZ, DEFAULT_RESOLUTION_BEAT, DEFAULT_SEARCH_WIN_SIZE_HZ, DEFAULT_USE_LONG_FFT_OPTIMIZATION};
pub use pitch_tracker::PitchTracker;
