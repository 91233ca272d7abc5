//! Pitch model (C1): frequency <-> (octave, semitone, cents error).
//!
//! `offset_from_c0` is the canonical coordinate: it linearizes musical
//! distance (a constant number of semitones per octave) so the pitch
//! tracker can compare pitches with a plain subtraction instead of a
//! frequency ratio.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ConfigError;

/// Minimum valid frequency. No pitch can be at or below this.
pub const MIN_FREQUENCY: f32 = 0.0;
/// Maximum valid frequency. No pitch can be above this.
pub const MAX_FREQUENCY: f32 = 20_000.0;

const FREQ_A4: f32 = 440.0;

/// Frequency of C0, the reference pitch all offsets are measured from:
/// `440 * 2^(-4 - 9/12)`.
pub static FREQ_C0: Lazy<f32> = Lazy::new(|| FREQ_A4 * 2f32.powf(-4.0 - 9.0 / 12.0));

/// Default octave used when a note literal omits one (e.g. `"A"` -> `A4`).
pub const STD_OCTAVE: i32 = 4;

pub const SEMITONE_TO_NOTE: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

fn note_to_semitone(note: char) -> i32 {
    match note {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => unreachable!("regex only matches A-G"),
    }
}

static NOTE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"([A-G])([#b]?)([0-9]?)").unwrap());

/// A pitch: a musical tone whose only defining attribute is a frequency.
///
/// Equality and hashing are by nominal `(octave, semitone)`: two pitches
/// within a fraction of a cent of the same equal-tempered note compare
/// equal, which is what the pitch tracker needs when deduplicating frames.
#[derive(Debug, Clone, Copy)]
pub struct Pitch {
    pub frequency: f32,
    pub offset_from_c0: f32,
    pub idx: i32,
    pub octave: i32,
    pub semitone: i32,
    pub note: &'static str,
    pub nominal_frequency: f32,
    pub error: f32,
}

impl Pitch {
    /// Builds a pitch from a frequency in Hz.
    ///
    /// Returns [`ConfigError::InvalidFrequency`] if `frequency` is outside
    /// `(MIN_FREQUENCY, MAX_FREQUENCY]`.
    pub fn new(frequency: f32) -> Result<Self, ConfigError> {
        if !(frequency > MIN_FREQUENCY && frequency <= MAX_FREQUENCY) {
            return Err(ConfigError::InvalidFrequency {
                frequency,
                min: MIN_FREQUENCY,
                max: MAX_FREQUENCY,
            });
        }

        let offset_from_c0 = (frequency / *FREQ_C0).log2() * 12.0;
        let idx = offset_from_c0.round() as i32;
        let octave = idx.div_euclid(12);
        let semitone = idx.rem_euclid(12);
        let note = SEMITONE_TO_NOTE[semitone as usize];
        let nominal_frequency = Self::frequency_from_octave_semitone(octave, semitone as f32);
        let error = frequency - nominal_frequency;

        Ok(Self {
            frequency,
            offset_from_c0,
            idx,
            octave,
            semitone,
            note,
            nominal_frequency,
            error,
        })
    }

    /// Real-valued semitone distance from `offset_from_c0`'s rounded integer index.
    pub fn error_in_semitones(&self) -> f32 {
        self.offset_from_c0 - self.idx as f32
    }

    /// Builds a pitch at the given octave and (possibly fractional) semitone
    /// distance from C in that octave, e.g. used by [`crate::tracker`] when
    /// nudging a tracked pitch by a fraction of a semitone.
    pub fn from_octave_semitone(octave: i32, semitone: f32) -> Result<Self, ConfigError> {
        Self::new(Self::frequency_from_octave_semitone(octave, semitone))
    }

    pub fn frequency_from_octave_semitone(octave: i32, semitone: f32) -> f32 {
        *FREQ_C0 * 2f32.powf(octave as f32 + semitone / 12.0)
    }

    /// Parses a single note literal of the form `NOTE[#|b][OCTAVE]`
    /// (default octave 4), e.g. `"A4"`, `"C#5"`, `"Bb3"`, `"E2"`.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let groups = NOTE_REGEX
            .captures(s)
            .filter(|c| c.get(0).map(|m| m.start() == 0).unwrap_or(false))
            .ok_or_else(|| ConfigError::UnparseableNote(s.to_string()))?;
        Self::from_captures(&groups)
    }

    /// Finds all note literals in `s`, with no required delimiter between them.
    pub fn parse_all(s: &str) -> Vec<Self> {
        NOTE_REGEX
            .captures_iter(s)
            .filter_map(|groups| Self::from_captures(&groups).ok())
            .collect()
    }

    fn from_captures(groups: &regex::Captures) -> Result<Self, ConfigError> {
        let note_char = groups[1].chars().next().unwrap();
        let mut semitone = note_to_semitone(note_char);

        match groups.get(2).map(|m| m.as_str()) {
            Some("#") => semitone += 1,
            Some("b") => semitone -= 1,
            _ => {}
        }

        let octave = groups.get(3).filter(|m| !m.as_str().is_empty()).map(|m| m.as_str().parse::<i32>().unwrap()).unwrap_or(STD_OCTAVE);

        // `semitone` may land outside [0, 11] here (e.g. "Cb" -> -1). Per the
        // open question in the spec this is intentionally *not* normalized:
        // it is passed straight through to `frequency_from_octave_semitone`,
        // whose exponent absorbs any fractional/negative semitone.
        Self::from_octave_semitone(octave, semitone as f32)
    }
}

impl PartialEq for Pitch {
    fn eq(&self, other: &Self) -> bool {
        self.octave == other.octave && self.semitone == other.semitone
    }
}
impl Eq for Pitch {}

impl std::hash::Hash for Pitch {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.octave.hash(state);
        self.semitone.hash(state);
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.note, self.octave)?;
        if self.error.abs() > 1e-3 {
            write!(f, " err {}Hz", self.error)?;
        }
        Ok(())
    }
}
