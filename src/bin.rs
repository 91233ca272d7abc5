//! CLI entry point.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use tunescribe_core::bands::{BandPeakFinder, DEFAULT_FFT_RESOLUTION_HZ as DEFAULT_TUNE_FFT_RESOLUTION_HZ};
use tunescribe_core::buffer::RingBuffer;
use tunescribe_core::driver::Driver;
use tunescribe_core::envelope::RmsEnvelope;
use tunescribe_core::error::Res;
use tunescribe_core::harmony::{HarmonyAnalyzer, DEFAULT_FFT_RESOLUTION_HZ as DEFAULT_HARMONY_FFT_RESOLUTION_HZ};
use tunescribe_core::segmenter::{SoundSegmenter, DEFAULT_MIN_NOISE_POWER, DEFAULT_MIN_SOUND_DURATION};
use tunescribe_core::sink::LoggingSink;
use tunescribe_core::source::{Fade, GeneratedSource, WavSource, GUITAR_TIMBRE};
use tunescribe_core::spectrum::SpectrumAnalyzer;
use tunescribe_core::stage::Stage;
use tunescribe_core::tracker::{NoteTracker, PitchTracker, DEFAULT_FFT_RESOLUTION_HZ, DEFAULT_RESOLUTION_BEAT, DEFAULT_SEARCH_WIN_SIZE_HZ, DEFAULT_USE_LONG_FFT_OPTIMIZATION};
use tunescribe_core::AudioSource;

const DEFAULT_PROCESSING_RATE_HZ: f32 = 8.0;
const DEFAULT_BUFFER_DURATION_S: f32 = 2.0;
const DEFAULT_BPM: f32 = 60.0;

/// Stage defaults the CLI can override from `tunescribe.toml`. Any field
/// left unset in the file keeps the value here, which mirrors each stage's
/// own built-in default.
struct Overrides {
    processing_rate_hz: f32,
    buffer_duration_s: f32,
    min_noise_power: f32,
    min_sound_duration_s: f32,
    bpm: f32,
}

impl Default for Overrides {
    fn default() -> Self {
        Self {
            processing_rate_hz: DEFAULT_PROCESSING_RATE_HZ,
            buffer_duration_s: DEFAULT_BUFFER_DURATION_S,
            min_noise_power: DEFAULT_MIN_NOISE_POWER,
            min_sound_duration_s: DEFAULT_MIN_SOUND_DURATION,
            bpm: DEFAULT_BPM,
        }
    }
}

#[cfg(feature = "config")]
fn load_overrides() -> Overrides {
    let mut overrides = Overrides::default();
    let path = tunescribe_core::config::discover_config_file();
    match tunescribe_core::config::load(path.as_deref()) {
        Ok(config) => {
            if let Some(v) = config.processing_rate_hz {
                overrides.processing_rate_hz = v;
            }
            if let Some(v) = config.buffer_duration_s {
                overrides.buffer_duration_s = v;
            }
            if let Some(v) = config.min_noise_power {
                overrides.min_noise_power = v;
            }
            if let Some(v) = config.min_sound_duration_s {
                overrides.min_sound_duration_s = v;
            }
            if let Some(v) = config.bpm {
                overrides.bpm = v;
            }
        }
        Err(e) => log::warn!("failed to load config, using built-in defaults: {e}"),
    }
    overrides
}

#[cfg(not(feature = "config"))]
fn load_overrides() -> Overrides {
    Overrides::default()
}

#[derive(Parser)]
#[command(name = "tunescribe", about = "Real-time pitch and note transcription")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Transcribe monophonic/polyphonic notes from a WAV file or the default microphone.
    Transcribe {
        #[arg(long)]
        wav: Option<PathBuf>,
        #[arg(long)]
        mic: bool,
    },
    /// Fixed-band guitar tuner mode.
    Tune {
        #[arg(long)]
        wav: Option<PathBuf>,
        #[arg(long)]
        mic: bool,
    },
    /// Chroma/harmony analysis (which semitone classes dominate).
    Harmony {
        #[arg(long)]
        wav: Option<PathBuf>,
        #[arg(long)]
        mic: bool,
    },
    /// Render a melody string to a WAV file via the built-in synthesizer.
    Synth {
        melody: String,
        #[arg(long, default_value = "synth.wav")]
        out: PathBuf,
        #[arg(long, default_value_t = 120.0)]
        bpm: f32,
    },
}

fn open_source(wav: Option<PathBuf>, mic: bool) -> Res<Box<dyn AudioSource>> {
    match (wav, mic) {
        (Some(path), _) => Ok(Box::new(WavSource::open(path)?)),
        #[cfg(feature = "soundcard")]
        (None, true) => Ok(Box::new(tunescribe_core::source::SoundCardSource::open_default()?)),
        #[cfg(not(feature = "soundcard"))]
        (None, true) => anyhow::bail!("built without the `soundcard` feature"),
        (None, false) => anyhow::bail!("pass --wav <file> or --mic"),
    }
}

fn run_driver(source: Box<dyn AudioSource>, stages: Vec<Box<dyn Stage>>, overrides: &Overrides) -> Res<()> {
    let sample_rate = source.sample_rate();
    let chunk_size = (sample_rate as f32 / overrides.processing_rate_hz) as usize;
    let mut driver = Driver::new(source, stages, Box::new(LoggingSink), chunk_size.max(1));
    driver.run()
}

fn transcribe(wav: Option<PathBuf>, mic: bool) -> Res<()> {
    let overrides = load_overrides();
    let source = open_source(wav, mic)?;
    let sample_rate = source.sample_rate();

    let stages: Vec<Box<dyn Stage>> = vec![
        Box::new(RingBuffer::new(sample_rate, overrides.buffer_duration_s)),
        Box::new(RmsEnvelope::default()),
        Box::new(SoundSegmenter::new(overrides.min_noise_power, overrides.min_sound_duration_s)),
        Box::new(SpectrumAnalyzer::with_defaults(sample_rate)?),
        Box::new(PitchTracker::default()),
        Box::new(NoteTracker::new(overrides.bpm, DEFAULT_RESOLUTION_BEAT, DEFAULT_FFT_RESOLUTION_HZ, DEFAULT_SEARCH_WIN_SIZE_HZ, DEFAULT_USE_LONG_FFT_OPTIMIZATION)),
    ];

    run_driver(source, stages, &overrides)
}

fn tune(wav: Option<PathBuf>, mic: bool) -> Res<()> {
    let overrides = load_overrides();
    let source = open_source(wav, mic)?;
    let sample_rate = source.sample_rate();

    let stages: Vec<Box<dyn Stage>> = vec![Box::new(BandPeakFinder::guitar_tuner(sample_rate, DEFAULT_TUNE_FFT_RESOLUTION_HZ)?)];

    run_driver(source, stages, &overrides)
}

fn harmony(wav: Option<PathBuf>, mic: bool) -> Res<()> {
    let overrides = load_overrides();
    let source = open_source(wav, mic)?;
    let sample_rate = source.sample_rate();

    let stages: Vec<Box<dyn Stage>> = vec![Box::new(HarmonyAnalyzer::with_defaults(sample_rate, DEFAULT_HARMONY_FFT_RESOLUTION_HZ)?)];

    run_driver(source, stages, &overrides)
}

fn synth(melody: String, out: PathBuf, bpm: f32) -> Res<()> {
    let overrides = load_overrides();
    let sample_rate = 44_100;
    let mut source = GeneratedSource::from_melody(sample_rate, overrides.processing_rate_hz, bpm, &melody, &GUITAR_TIMBRE, Fade::default())?;

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&out, spec)?;

    loop {
        let chunk = source.read(4_096)?;
        if chunk.is_empty() {
            break;
        }
        for sample in chunk {
            writer.write_sample(sample)?;
        }
    }
    writer.finalize()?;

    log::info!("wrote {}", out.display());
    Ok(())
}

fn main() -> Res<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Transcribe { wav, mic } => transcribe(wav, mic),
        Command::Tune { wav, mic } => tune(wav, mic),
        Command::Harmony { wav, mic } => harmony(wav, mic),
        Command::Synth { melody, out, bpm } => synth(melody, out, bpm),
    }
}
