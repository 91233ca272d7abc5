//! Sound-card audio source, backed by `cpal`'s default input device.
//!
//! `cpal` delivers samples on its own callback thread; `read` blocks the
//! driver thread on a condvar until enough samples have accumulated, which
//! is the one place in the whole pipeline allowed to block.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::AudioSource;
use crate::error::SourceError;

struct Shared {
    queue: Mutex<VecDeque<f32>>,
    ready: Condvar,
}

pub struct SoundCardSource {
    sample_rate: u32,
    shared: Arc<Shared>,
    // Keeping the stream alive keeps the callback running; never read directly.
    _stream: cpal::Stream,
}

impl SoundCardSource {
    /// Opens the default input device and starts streaming immediately.
    pub fn open_default() -> Result<Self, SourceError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or_else(|| SourceError::Device("no default input device".into()))?;
        let config = device.default_input_config().map_err(|e| SourceError::Device(e.to_string()))?;
        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;

        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            ready: Condvar::new(),
        });

        let stream_shared = shared.clone();
        let stream = device
            .build_input_stream::<f32, _, _>(
                &config.into(),
                move |data: &[f32], _| {
                    let mut queue = stream_shared.queue.lock().unwrap();
                    if channels <= 1 {
                        queue.extend(data.iter().copied());
                    } else {
                        queue.extend(data.chunks(channels).map(|frame| frame.iter().sum::<f32>() / channels as f32));
                    }
                    stream_shared.ready.notify_one();
                },
                |err| log::error!("soundcard input stream error: {err}"),
                None,
            )
            .map_err(|e| SourceError::Device(e.to_string()))?;

        stream.play().map_err(|e| SourceError::Device(e.to_string()))?;

        Ok(Self { sample_rate, shared, _stream: stream })
    }
}

impl AudioSource for SoundCardSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read(&mut self, chunk_size: usize) -> Result<Vec<f32>, SourceError> {
        let mut queue = self.shared.queue.lock().unwrap();
        while queue.len() < chunk_size {
            queue = self.shared.ready.wait(queue).unwrap();
        }
        Ok(queue.drain(..chunk_size).collect())
    }
}
