//! Application driver (C11): the single-threaded loop that owns the audio
//! source, the stage chain, and the output sink.
//!
//! Resource discipline mirrors the original's scoped `__enter__`/`__exit__`
//! context manager: instead of a `with` block, the source is just an owned
//! value and its `Drop` impl (in `hound`/`cpal`, not ours to write) releases
//! the underlying file handle or stream when the driver's `run` returns.

use anyhow::Context;

use crate::bag::Bag;
use crate::error::Res;
use crate::sink::OutputSink;
use crate::source::AudioSource;
use crate::stage::Stage;

pub struct Driver<S: AudioSource> {
    source: S,
    stages: Vec<Box<dyn Stage>>,
    sink: Box<dyn OutputSink>,
    chunk_size: usize,
    iteration: u64,
    current_sample: u64,
}

impl<S: AudioSource> Driver<S> {
    pub fn new(source: S, stages: Vec<Box<dyn Stage>>, sink: Box<dyn OutputSink>, chunk_size: usize) -> Self {
        Self {
            source,
            stages,
            sink,
            chunk_size,
            iteration: 0,
            current_sample: 0,
        }
    }

    /// Runs the pipeline to completion: reads chunks until the source
    /// returns an empty one, running every stage then the sink each
    /// iteration. `current_sample` always names the count of samples read
    /// *before* this iteration, so a stage sees the sample index its
    /// incoming chunk starts at.
    pub fn run(&mut self) -> Res<()> {
        let sample_rate = self.source.sample_rate();
        log::info!("driver: starting, sample_rate={sample_rate}, chunk_size={}", self.chunk_size);

        loop {
            let chunk = self.source.read(self.chunk_size).context("reading audio chunk")?;
            if chunk.is_empty() {
                log::info!("driver: end of stream at sample {}", self.current_sample);
                break;
            }

            let chunk_len = chunk.len() as u64;
            let mut bag = Bag::new(self.iteration, self.current_sample, sample_rate, chunk);

            for stage in &mut self.stages {
                stage.process(&mut bag).with_context(|| format!("stage '{}' failed", stage.name()))?;
            }

            self.sink.on_iteration(&bag).context("output sink failed")?;

            self.iteration += 1;
            self.current_sample += chunk_len;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::error::SourceError;

    struct FiniteSource {
        sample_rate: u32,
        remaining: Vec<f32>,
    }

    impl AudioSource for FiniteSource {
        fn sample_rate(&self) -> u32 {
            self.sample_rate
        }

        fn read(&mut self, chunk_size: usize) -> Result<Vec<f32>, SourceError> {
            let take = chunk_size.min(self.remaining.len());
            Ok(self.remaining.drain(..take).collect())
        }
    }

    struct CountingSink {
        iterations: Rc<RefCell<u64>>,
    }

    impl OutputSink for CountingSink {
        fn on_iteration(&mut self, bag: &Bag) -> Res<()> {
            *self.iterations.borrow_mut() = bag.iteration + 1;
            Ok(())
        }
    }

    #[test]
    fn stops_at_end_of_stream_and_advances_clocks() {
        let source = FiniteSource {
            sample_rate: 10,
            remaining: vec![0.0; 25],
        };
        let iterations = Rc::new(RefCell::new(0));
        let sink = CountingSink { iterations: iterations.clone() };

        let mut driver = Driver::new(source, Vec::new(), Box::new(sink), 10);
        driver.run().unwrap();

        assert_eq!(*iterations.borrow(), 3); // 10 + 10 + 5 samples
        assert_eq!(driver.current_sample, 25);
    }

    #[test]
    fn empty_source_runs_zero_iterations() {
        let source = FiniteSource { sample_rate: 10, remaining: vec![] };
        let iterations = Rc::new(RefCell::new(0));
        let sink = CountingSink { iterations: iterations.clone() };

        let mut driver = Driver::new(source, Vec::new(), Box::new(sink), 10);
        driver.run().unwrap();

        assert_eq!(*iterations.borrow(), 0);
    }
}
