//! End-to-end scenarios from the testable-properties scenario list: a pure
//! tone, a silent signal, a segmenter debounce case, and a fixed-band tuner
//! reading.

use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;

use tunescribe_core::bag::Bag;
use tunescribe_core::bands::BandPeakFinder;
use tunescribe_core::envelope::RmsEnvelope;
use tunescribe_core::error::Res;
use tunescribe_core::pitch::Pitch;
use tunescribe_core::segmenter::SoundSegmenter;
use tunescribe_core::sink::OutputSink;
use tunescribe_core::source::{Fade, GeneratedSource, WavSource, ZERO_TIMBRE};
use tunescribe_core::spectrum::SpectrumAnalyzer;
use tunescribe_core::stage::Stage;
use tunescribe_core::AudioSource;

struct CollectingSink {
    notes: Rc<RefCell<Vec<String>>>,
    sound_regions: Rc<RefCell<usize>>,
    powerful_semitones: Rc<RefCell<usize>>,
}

impl OutputSink for CollectingSink {
    fn on_iteration(&mut self, bag: &Bag) -> Res<()> {
        for note in &bag.notes {
            self.notes.borrow_mut().push(format!("{}{}", note.pitch.note, note.pitch.octave));
        }
        *self.sound_regions.borrow_mut() += bag.sounds_split_points.len();
        if let Some(powerful) = &bag.powerful_semitones {
            *self.powerful_semitones.borrow_mut() += powerful.len();
        }
        Ok(())
    }
}

#[test]
fn pure_c4_tone_is_detected_on_every_nonempty_chunk() {
    let sample_rate = 44_100;
    let mut source = GeneratedSource::from_melody(sample_rate, 8.0, 120.0, "C", &ZERO_TIMBRE, Fade { fade_in_s: 0.0, fade_out_s: 0.0 }).unwrap();

    let mut analyzer = SpectrumAnalyzer::with_defaults(sample_rate).unwrap();
    let c4 = Pitch::parse("C4").unwrap();

    let mut saw_any_chunk = false;
    loop {
        let chunk = source.read(0).unwrap();
        if chunk.is_empty() {
            break;
        }
        saw_any_chunk = true;

        let mut bag = Bag::new(0, 0, sample_rate, chunk);
        analyzer.process(&mut bag).unwrap();

        let pitches = bag.pitches.unwrap();
        assert!(pitches.iter().any(|p| *p == c4), "expected C4 among {pitches:?}");
    }
    assert!(saw_any_chunk);
}

#[test]
fn silence_produces_no_sounds_notes_or_powerful_semitones() {
    let sample_rate = 44_100u32;
    let samples = vec![0.0f32; sample_rate as usize * 2];

    let mut cursor = 0usize;
    let chunk_size = (sample_rate as f32 / 8.0) as usize;

    let notes = Rc::new(RefCell::new(Vec::new()));
    let sound_regions = Rc::new(RefCell::new(0usize));
    let powerful_semitones = Rc::new(RefCell::new(0usize));
    let mut sink = CollectingSink {
        notes: notes.clone(),
        sound_regions: sound_regions.clone(),
        powerful_semitones: powerful_semitones.clone(),
    };

    let mut ring_buffer = tunescribe_core::buffer::RingBuffer::new(sample_rate, 2.0);
    let mut envelope = RmsEnvelope::default();
    let mut segmenter = SoundSegmenter::default();

    let mut iteration = 0u64;
    while cursor < samples.len() {
        let end = (cursor + chunk_size).min(samples.len());
        let chunk = samples[cursor..end].to_vec();
        cursor = end;

        let mut bag = Bag::new(iteration, cursor as u64 - chunk.len() as u64, sample_rate, chunk);
        ring_buffer.process(&mut bag).unwrap();
        envelope.process(&mut bag).unwrap();
        segmenter.process(&mut bag).unwrap();
        sink.on_iteration(&bag).unwrap();

        iteration += 1;
    }

    assert!(notes.borrow().is_empty());
    assert_eq!(*sound_regions.borrow(), 0);
    assert_eq!(*powerful_semitones.borrow(), 0);
}

#[test]
fn short_pulse_below_min_duration_is_debounced() {
    let sample_rate = 1_000u32;
    let mut segmenter = SoundSegmenter::new(0.01, 0.5);

    // Loud for 0.1s (below the 0.5s minimum), then quiet.
    let mut loud = Bag::new(0, 0, sample_rate, vec![0.5; 100]);
    loud.rms = Some(vec![0.25]);
    loud.buffered_signal = Some(vec![0.5; 100]);
    loud.buffered_signal_start = Some(0);
    segmenter.process(&mut loud).unwrap();
    assert!(loud.sounds_split_points.is_empty());

    let mut quiet = Bag::new(1, 100, sample_rate, vec![0.0; 100]);
    quiet.rms = Some(vec![0.0]);
    quiet.buffered_signal = Some(vec![0.5; 200]);
    quiet.buffered_signal_start = Some(0);
    segmenter.process(&mut quiet).unwrap();

    assert!(quiet.sounds_split_points.is_empty());
}

#[test]
fn guitar_tuner_reads_82hz_on_the_low_e_string_only() {
    let sample_rate = 8_000u32;
    let duration_s = 1.0;
    let freq = 82.0f32;
    let n = (sample_rate as f32 * duration_s) as usize;
    let signal: Vec<f32> = (0..n).map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin()).collect();

    let fft_resolution_hz = sample_rate as f32 / n as f32;
    let mut finder = BandPeakFinder::guitar_tuner(sample_rate, fft_resolution_hz).unwrap();
    let mut bag = Bag::new(0, 0, sample_rate, signal);
    finder.process(&mut bag).unwrap();

    let peaks = bag.bands_peak.unwrap();
    let low_e = peaks[0].expect("low E string band should find a peak");
    assert!((low_e - freq).abs() < 0.1, "got {low_e}");

    for (i, peak) in peaks.iter().enumerate().skip(1) {
        if let Some(p) = peak {
            assert!((p - freq).abs() > 1.0, "band {i} unexpectedly close to {freq}: {p}");
        }
    }
}

#[test]
fn c_major_scale_wav_round_trip_preserves_sample_rate_and_length() {
    let sample_rate = 44_100;
    let mut source = GeneratedSource::from_melody(sample_rate, 8.0, 120.0, "C D E F G A B C5", &ZERO_TIMBRE, Fade { fade_in_s: 0.0, fade_out_s: 0.0 }).unwrap();

    let mut rendered = Vec::new();
    loop {
        let chunk = source.read(4_096).unwrap();
        if chunk.is_empty() {
            break;
        }
        rendered.extend(chunk);
    }
    assert!(!rendered.is_empty());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cmaj_scale.wav");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for &s in &rendered {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();

    let mut wav_source = WavSource::open(&path).unwrap();
    assert_eq!(wav_source.sample_rate(), sample_rate);

    let mut read_back = Vec::new();
    loop {
        let chunk = wav_source.read(4_096).unwrap();
        if chunk.is_empty() {
            break;
        }
        read_back.extend(chunk);
    }
    assert_eq!(read_back.len(), rendered.len());
}
