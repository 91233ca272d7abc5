//! Note model (C2): a pitch bounded by a start/end sample, with an optional
//! BPM-derived rhythmic value in beats.

use std::fmt;

use crate::pitch::Pitch;

/// A detected (or synthesized) note: a [`Pitch`] held from `start_s` to `end_s`,
/// optionally annotated with beat positions when a BPM is known.
///
/// Invariant: `end_s > start_s`.
#[derive(Debug, Clone, Copy)]
pub struct Note {
    pub pitch: Pitch,
    pub start_s: f32,
    pub end_s: f32,
    pub start_beat: Option<f32>,
    pub end_beat: Option<f32>,
    /// Duration in beats. Only computed when a BPM was supplied.
    pub value: Option<f32>,
}

impl Note {
    /// Builds a note. `bpm`, if given, populates `start_beat`/`end_beat`/`value`.
    ///
    /// # Panics
    /// Panics if `end_s <= start_s` (the invariant is a construction-time
    /// contract enforced by the caller, not a recoverable runtime error: it
    /// would indicate a tracker bug, not bad input).
    pub fn new(pitch: Pitch, start_s: f32, end_s: f32, bpm: Option<f32>) -> Self {
        assert!(end_s > start_s, "note end_s ({end_s}) must be > start_s ({start_s})");

        let (start_beat, end_beat, value) = match bpm {
            Some(bpm) => {
                let start_beat = start_s * bpm / 60.0;
                let end_beat = end_s * bpm / 60.0;
                (Some(start_beat), Some(end_beat), Some(end_beat - start_beat))
            }
            None => (None, None, None),
        };

        Self {
            pitch,
            start_s,
            end_s,
            start_beat,
            end_beat,
            value,
        }
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start_beat, self.end_beat, self.value) {
            (Some(start_beat), Some(_), Some(value)) => {
                write!(f, "at beat {}: {}{}({}) value {} beats", start_beat, self.pitch.note, self.pitch.octave, self.pitch.offset_from_c0, value)?;
            }
            _ => {
                write!(f, "{}{} from {}s to {}s", self.pitch.note, self.pitch.octave, self.start_s, self.end_s)?;
            }
        }

        if self.pitch.error_in_semitones().abs() >= 0.01 {
            write!(f, " - pitch err {}/100", (self.pitch.error_in_semitones() * 100.0) as i32)?;
        }

        Ok(())
    }
}
