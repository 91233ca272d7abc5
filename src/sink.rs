//! Output sinks (C12): what the driver does with each iteration's bag after
//! every stage has run.

use crate::bag::Bag;
use crate::error::Res;
use crate::pitch::SEMITONE_TO_NOTE;

/// Consumes the fully-populated bag at the end of an iteration.
pub trait OutputSink {
    fn on_iteration(&mut self, bag: &Bag) -> Res<()>;
}

/// Default sink: logs human-readable summaries of notes, powerful
/// semitones, and per-band tuning errors at the cadence each signal
/// actually changes.
#[derive(Debug, Default)]
pub struct LoggingSink;

impl OutputSink for LoggingSink {
    fn on_iteration(&mut self, bag: &Bag) -> Res<()> {
        for note in &bag.notes {
            log::info!("note: {note}");
        }

        if let Some(powerful) = &bag.powerful_semitones {
            if !powerful.is_empty() {
                let names: Vec<&str> = powerful.iter().map(|p| SEMITONE_TO_NOTE[p.semitone as usize]).collect();
                log::info!("powerful semitones: {names:?}");
            }
        }

        if let Some(bands) = &bag.bands_peak {
            for (i, peak) in bands.iter().enumerate() {
                if let Some(freq) = peak {
                    log::debug!("band[{i}] peak {freq:.2} Hz");
                }
            }
        }

        Ok(())
    }
}

#[cfg(feature = "playback")]
mod player {
    use std::sync::Arc;

    use rodio::{OutputStream, Sink};

    use super::*;

    /// Re-emits each iteration's `source_signal` to the default audio output
    /// device via `rodio`.
    pub struct PlayerSink {
        _stream: OutputStream,
        sink: Sink,
    }

    impl PlayerSink {
        pub fn open_default() -> Res<Self> {
            let (stream, handle) = OutputStream::try_default()?;
            let sink = Sink::try_new(&handle)?;
            Ok(Self { _stream: stream, sink })
        }
    }

    impl OutputSink for PlayerSink {
        fn on_iteration(&mut self, bag: &Bag) -> Res<()> {
            if bag.source_signal.is_empty() {
                return Ok(());
            }
            let samples: Arc<[f32]> = Arc::from(bag.source_signal.clone().into_boxed_slice());
            let source = rodio::buffer::SamplesBuffer::new(1, bag.sample_rate, samples.to_vec());
            self.sink.append(source);
            Ok(())
        }
    }
}

#[cfg(feature = "playback")]
pub use player::PlayerSink;
