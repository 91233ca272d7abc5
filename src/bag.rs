//! The per-iteration signal bag.
//!
//! The original design passes an open string-keyed mapping through the
//! pipeline; a stage that forgets to check for a key before reading it fails
//! at runtime. Per the redesign note in the spec, this crate instead uses a
//! single typed struct with one `Option<T>` field per documented signal:
//! a missing signal is `None`, checked by the compiler at every read site,
//! and `cargo doc` on this struct is the pipeline's signal reference.

use std::collections::HashMap;

use crate::note::Note;
use crate::pitch::Pitch;

/// All signals that can flow through one iteration of the pipeline.
///
/// Fields are populated stage by stage, in the order stages run in the
/// driver. A stage only ever reads fields produced by stages earlier in its
/// chain and only ever writes the fields documented as its own output.
#[derive(Debug, Default, Clone)]
pub struct Bag {
    // Driver-supplied clocks (C11).
    pub iteration: u64,
    pub current_sample: u64,
    pub t: f32,
    pub sample_rate: u32,

    // Audio source output (C12).
    pub source_signal: Vec<f32>,

    // Ring buffer output (C3).
    pub buffered_signal: Option<Vec<f32>>,
    pub buffered_signal_start: Option<u64>,

    // RMS/power envelope output (C4).
    pub rms: Option<Vec<f32>>,

    // Sound segmenter output (C5).
    pub split_sound: Option<Vec<f32>>,
    pub sounds_split_points: Vec<(u64, u64)>,

    // Spectrum analyzer output (C6).
    pub spectrum: Option<Vec<rustfft::num_complex::Complex32>>,
    pub spectrum_amp: Option<Vec<f32>>,
    pub spectrum_peaks_idx: Option<Vec<usize>>,
    pub spectrum_peaks_freq: Option<Vec<f32>>,
    pub pitches: Option<Vec<Pitch>>,

    // Pitch tracker output (C9): pitch -> iteration it started on.
    pub started_pitches: Option<HashMap<Pitch, u64>>,
    pub ongoing_pitches: Option<HashMap<Pitch, u64>>,
    pub finished_pitches: Option<HashMap<Pitch, u64>>,

    // Note tracker output (C10).
    pub notes: Vec<Note>,

    // Harmony analyzer output (C8).
    pub semitone_power: Option<[f32; 12]>,
    pub semitone_relative_power: Option<[f32; 12]>,
    pub powerful_semitones: Option<Vec<Pitch>>,

    // Band peak finder output (C7).
    pub bands_peak: Option<Vec<Option<f32>>>,
}

impl Bag {
    /// Starts a new bag for `iteration`, seeded with the driver's clocks and
    /// the freshly read audio chunk. All per-iteration outputs reset to
    /// their `None`/empty defaults.
    pub fn new(iteration: u64, current_sample: u64, sample_rate: u32, source_signal: Vec<f32>) -> Self {
        Self {
            iteration,
            current_sample,
            t: current_sample as f32 / sample_rate as f32,
            sample_rate,
            source_signal,
            ..Default::default()
        }
    }
}
