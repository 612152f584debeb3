use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use super::types::{ContainerKind, Frame, Rational};
use crate::error::VideoError;

/// Decoder capability consumed by the playback controller.
///
/// All times are in the source's native time scale (`time_scale()` units per
/// second). Only the owning controller may call into a source.
pub trait VideoSource {
    fn container(&self) -> ContainerKind;

    /// Native units per second.
    fn time_scale(&self) -> u32;

    /// Clip length in native units.
    fn duration(&self) -> i64;

    /// Playback position in native units.
    fn time(&self) -> i64;

    /// Index of the last frame returned by `decode_next_frame`.
    fn current_frame_index(&self) -> Option<usize>;

    fn frame_size(&self) -> (u32, u32);

    /// Next frame in native pixel format. `Ok(None)` when the current frame is
    /// still current or the end has been reached.
    fn decode_next_frame(&mut self) -> Result<Option<Frame>, VideoError>;

    /// True when a frame newer than the last decoded one is due.
    fn needs_update(&self) -> bool;

    fn end_of_video(&self) -> bool;

    fn seek(&mut self, time: i64) -> Result<(), VideoError>;

    fn set_rate(&mut self, rate: Rational);

    fn rate(&self) -> Rational;

    /// Stop producing frames past `time`.
    fn set_end_time(&mut self, time: i64);

    fn start(&mut self);

    fn stop(&mut self);

    fn rewind(&mut self) -> Result<(), VideoError> {
        self.seek(0)
    }

    fn is_playing(&self) -> bool;

    fn is_paused(&self) -> bool;

    fn pause(&mut self, paused: bool);

    /// Native volume, 0..=255.
    fn set_volume(&mut self, volume: u8);
}

/// Millisecond wall clock used by decoders to derive playback position.
pub trait MediaClock {
    fn now_ms(&self) -> u64;
}

/// Real time since construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaClock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Hand-driven clock shared between a decoder and whoever advances it.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }
}

impl MediaClock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}
