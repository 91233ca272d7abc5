//! The stage abstraction stitched together by the driver (C11).
//!
//! Per the design notes, each stage is an object owning private state across
//! iterations (a ring buffer, a segmenter state machine, a tracker map) that
//! mutates the shared [`Bag`] in place. Composition is a static `Vec` built
//! by the application factory; no dynamic dispatch is required on the hot
//! path beyond the one `Vec<Box<dyn Stage>>` indirection, which is cheap
//! next to an FFT.

use crate::bag::Bag;
use crate::error::StageError;

/// A single stateful processing stage in the pipeline.
pub trait Stage {
    /// Human-readable name, used in [`StageError`] messages.
    fn name(&self) -> &'static str;

    /// Consumes the documented subset of `bag` and writes the documented
    /// subset of outputs. Returns `Ok(())` even on benign empty input (the
    /// stage simply adds no keys); returns `Err` only for a genuine
    /// pipeline misconfiguration (a required upstream signal is missing).
    fn process(&mut self, bag: &mut Bag) -> Result<(), StageError>;
}
