//! Pitch tracker (C9): associates this frame's detected pitches with pitches
//! already being tracked, within `max_delta` semitones of `offset_from_c0`.
//!
//! A pitch already being tracked that finds no match this frame is reported
//! as finished; a new pitch that matches nothing already tracked is reported
//! as started; everything else just continues. Association is first-match,
//! not best-match: once a tracked pitch claims an incoming one, later
//! tracked pitches don't get a second look at it. Internal order is kept in
//! insertion order (oldest-tracked pitch claims first) rather than a
//! `HashMap`'s unspecified iteration order, to keep the first-match
//! resolution deterministic when two tracked pitches are both within
//! `max_delta` of the same incoming one.

use std::collections::HashMap;

use crate::bag::Bag;
use crate::error::StageError;
use crate::pitch::Pitch;
use crate::stage::Stage;

pub const DEFAULT_MAX_PITCH_DELTA_SEMITONES: f32 = 0.25;

pub struct PitchTracker {
    max_delta: f32,
    /// Pitches currently tracked, oldest first, each paired with the
    /// iteration it started on.
    current_pitches: Vec<(Pitch, u64)>,
}

impl PitchTracker {
    pub fn new(max_delta: f32) -> Self {
        Self { max_delta, current_pitches: Vec::new() }
    }
}

impl Default for PitchTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PITCH_DELTA_SEMITONES)
    }
}

impl Stage for PitchTracker {
    fn name(&self) -> &'static str {
        "pitch_tracker"
    }

    fn process(&mut self, bag: &mut Bag) -> Result<(), StageError> {
        if bag.source_signal.is_empty() {
            return Ok(());
        }

        let pitches = bag.pitches.as_ref().ok_or(StageError::MissingSignal {
            stage: "pitch_tracker",
            signal: "pitches",
        })?;

        let mut ongoing: Vec<(Pitch, u64)> = Vec::new();
        let mut started: Vec<(Pitch, u64)> = Vec::new();
        let mut claimed = vec![false; self.current_pitches.len()];

        for &p in pitches {
            let mut found = false;
            for (idx, &(cp, cpv)) in self.current_pitches.iter().enumerate() {
                if claimed[idx] {
                    continue;
                }
                if (cp.offset_from_c0 - p.offset_from_c0).abs() < self.max_delta {
                    ongoing.push((cp, cpv));
                    claimed[idx] = true;
                    found = true;
                    break;
                }
            }
            if !found {
                started.push((p, bag.iteration));
            }
        }

        let finished: Vec<(Pitch, u64)> = self.current_pitches.iter().enumerate().filter(|(idx, _)| !claimed[*idx]).map(|(_, &pv)| pv).collect();

        self.current_pitches = ongoing.iter().chain(started.iter()).cloned().collect();

        log::debug!("pitch_tracker: started={} ongoing={} finished={}", started.len(), ongoing.len(), finished.len());

        bag.started_pitches = Some(started.into_iter().collect::<HashMap<_, _>>());
        bag.ongoing_pitches = Some(ongoing.into_iter().collect::<HashMap<_, _>>());
        bag.finished_pitches = Some(finished.into_iter().collect::<HashMap<_, _>>());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn bag_with_pitches(iteration: u64, pitches: Vec<Pitch>) -> Bag {
        let mut bag = Bag::new(iteration, 0, 44_100, vec![0.0]);
        bag.pitches = Some(pitches);
        bag
    }

    #[test]
    fn new_pitch_is_started() {
        let mut tracker = PitchTracker::default();
        let a4 = Pitch::parse("A4").unwrap();

        let mut bag = bag_with_pitches(0, vec![a4]);
        tracker.process(&mut bag).unwrap();

        assert_eq!(bag.started_pitches.unwrap().len(), 1);
        assert!(bag.ongoing_pitches.unwrap().is_empty());
        assert!(bag.finished_pitches.unwrap().is_empty());
    }

    #[test]
    fn held_pitch_becomes_ongoing() {
        let mut tracker = PitchTracker::default();
        let a4 = Pitch::parse("A4").unwrap();

        let mut first = bag_with_pitches(0, vec![a4]);
        tracker.process(&mut first).unwrap();

        let mut second = bag_with_pitches(1, vec![a4]);
        tracker.process(&mut second).unwrap();

        assert!(second.started_pitches.unwrap().is_empty());
        assert_eq!(second.ongoing_pitches.unwrap().len(), 1);
        assert!(second.finished_pitches.unwrap().is_empty());
    }

    #[test]
    fn dropped_pitch_is_finished() {
        let mut tracker = PitchTracker::default();
        let a4 = Pitch::parse("A4").unwrap();

        let mut first = bag_with_pitches(0, vec![a4]);
        tracker.process(&mut first).unwrap();

        let mut second = bag_with_pitches(1, vec![]);
        tracker.process(&mut second).unwrap();

        assert_eq!(second.finished_pitches.unwrap().len(), 1);
        assert!(tracker.current_pitches.is_empty());
    }

    #[test]
    fn small_drift_stays_within_same_track() {
        let mut tracker = PitchTracker::new(0.25);
        let a4 = Pitch::parse("A4").unwrap();
        let a4_sharp_cents = Pitch::from_octave_semitone(4, 9.1).unwrap();

        let mut first = bag_with_pitches(0, vec![a4]);
        tracker.process(&mut first).unwrap();

        let mut second = bag_with_pitches(1, vec![a4_sharp_cents]);
        tracker.process(&mut second).unwrap();

        assert_eq!(second.ongoing_pitches.unwrap().len(), 1);
    }

    #[test]
    fn empty_chunk_is_benign() {
        let mut tracker = PitchTracker::default();
        let mut bag = Bag::new(0, 0, 44_100, vec![]);
        assert!(tracker.process(&mut bag).is_ok());
    }

    #[test]
    fn missing_upstream_signal_is_a_stage_error() {
        let mut tracker = PitchTracker::default();
        let mut bag = Bag::new(0, 0, 44_100, vec![0.0]);
        assert_eq!(
            tracker.process(&mut bag),
            Err(crate::error::StageError::MissingSignal {
                stage: "pitch_tracker",
                signal: "pitches",
            })
        );
    }

    #[test]
    fn large_drift_starts_a_new_track() {
        let mut tracker = PitchTracker::new(0.25);
        let a4 = Pitch::parse("A4").unwrap();
        let b4 = Pitch::parse("B4").unwrap();

        let mut first = bag_with_pitches(0, vec![a4]);
        tracker.process(&mut first).unwrap();

        let mut second = bag_with_pitches(1, vec![b4]);
        tracker.process(&mut second).unwrap();

        assert_eq!(second.started_pitches.unwrap().len(), 1);
        assert_eq!(second.finished_pitches.unwrap().len(), 1);
    }
}
