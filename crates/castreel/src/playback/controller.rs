use std::path::Path;

use serde::{Deserialize, Serialize};

use super::clock::{self, PlayRange, PlaybackClock};
use super::frame_cache::FrameCache;
use crate::error::VideoError;
use crate::media::decoder::{OpenOptions, open_video};
use crate::media::source::VideoSource;
use crate::media::types::{ContainerKind, Frame, Rational};
use crate::render::surface::RenderContext;

/// Controller play state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Stopped,
    Playing,
    /// Reached the clip's final bound; end handling runs on the next tick so
    /// the last frame is rendered at least once.
    PlayingLastFrame,
}

/// How many frames a tick may decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FramePolicy {
    /// Catch up to the decoder clock, skipping intermediate frames.
    #[default]
    Normal,
    /// At most one new frame per tick.
    EveryFrame,
}

/// Events produced by a tick, in the order they happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// The current timestamp moved during playback.
    TimeChanged { from: i64, to: i64 },
    /// Playback hit the end bound of its range. When `looped` is false the
    /// controller has stopped; otherwise it restarts from the opposite bound.
    RangeEnd { reversed: bool, looped: bool },
}

/// Owns one video source and drives it from the application's tick.
///
/// Timestamps are in external ticks (`external_scale` per second). A missing
/// or failed source turns every operation into a no-op that still tracks
/// state, so callers never need to special-case "no video".
pub struct VideoPlaybackController {
    source: Option<Box<dyn VideoSource>>,
    clock: PlaybackClock,
    cache: FrameCache,
    state: PlayState,
    looping: bool,
    reversed: bool,
    needs_reset: bool,
    /// Reversed playback on a decoder that can only run forward. Position
    /// holds at the start bound until direction or source changes.
    reverse_stalled: bool,
    paused: bool,
    policy: FramePolicy,
    rate: Rational,
    raw_range: PlayRange,
    current: i64,
    volume: u8,
}

impl VideoPlaybackController {
    pub fn new(external_scale: u32) -> Self {
        Self {
            source: None,
            clock: PlaybackClock::new(external_scale, external_scale),
            cache: FrameCache::new(),
            state: PlayState::Stopped,
            looping: false,
            reversed: false,
            needs_reset: false,
            reverse_stalled: false,
            paused: false,
            policy: FramePolicy::Normal,
            rate: Rational::ONE,
            raw_range: PlayRange::UNSET,
            current: 0,
            volume: 255,
        }
    }

    /// Trial-load `path` and bind it. On failure the controller is left with no video.
    pub fn load(&mut self, path: &Path, options: &OpenOptions) -> Result<(), VideoError> {
        self.unload();
        let source = open_video(path, options)?;
        self.attach(source);
        Ok(())
    }

    /// Bind an already-opened source, replacing any previous one.
    pub fn attach(&mut self, mut source: Box<dyn VideoSource>) {
        self.cache.clear();
        self.clock.set_native_scale(source.time_scale());
        source.set_volume(self.volume);
        if !self.rate.is_negative() {
            source.set_rate(self.rate);
        }
        self.source = Some(source);
        self.state = PlayState::Stopped;
        let real = self.real_range();
        self.current = clock::clamp_to_range(self.current, real, self.reversed);
        // Decode the first frame on the next tick so there's something to show
        self.needs_reset = true;
    }

    /// Release the source and cached frames.
    pub fn unload(&mut self) {
        self.source = None;
        self.cache.clear();
        self.state = PlayState::Stopped;
        self.needs_reset = false;
        self.reverse_stalled = false;
    }

    fn disable(&mut self) {
        self.unload();
    }

    pub fn has_video(&self) -> bool {
        self.source.is_some()
    }

    pub fn container(&self) -> ContainerKind {
        self.source
            .as_ref()
            .map_or(ContainerKind::Unknown, |s| s.container())
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state != PlayState::Stopped
    }

    pub fn needs_reset(&self) -> bool {
        self.needs_reset
    }

    /// Clip length in external ticks (0 without video).
    pub fn duration(&self) -> i64 {
        self.source
            .as_ref()
            .map_or(0, |s| self.clock.to_external(s.duration()))
    }

    pub fn current_timestamp(&self) -> i64 {
        self.current
    }

    pub fn current_frame_index(&self) -> Option<usize> {
        self.source.as_ref().and_then(|s| s.current_frame_index())
    }

    pub fn frame_size(&self) -> (u32, u32) {
        self.source.as_ref().map_or((0, 0), |s| s.frame_size())
    }

    /// Range as set by script, possibly the `(0, 0)` sentinel.
    pub fn play_range(&self) -> PlayRange {
        self.raw_range
    }

    /// Range actually played.
    pub fn real_range(&self) -> PlayRange {
        clock::compute_real_range(self.raw_range, self.duration())
    }

    pub fn set_play_range(&mut self, range: PlayRange) {
        self.raw_range = range;
        let real = self.real_range();
        self.current = clock::clamp_to_range(self.current, real, self.reversed);
        // End time depends on the range
        self.needs_reset = self.has_video();
        if self.state == PlayState::PlayingLastFrame {
            self.state = PlayState::Playing;
        }
    }

    pub fn looping(&self) -> bool {
        self.looping
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    pub fn reversed(&self) -> bool {
        self.reversed
    }

    pub fn set_reversed(&mut self, reversed: bool) {
        if self.reversed != reversed {
            self.reversed = reversed;
            self.needs_reset = self.has_video();
        }
    }

    pub fn frame_policy(&self) -> FramePolicy {
        self.policy
    }

    pub fn set_frame_policy(&mut self, policy: FramePolicy) {
        self.policy = policy;
    }

    pub fn rate(&self) -> Rational {
        self.rate
    }

    /// Negative rates are accepted but decoders keep playing forward.
    pub fn set_rate(&mut self, rate: Rational) {
        self.rate = rate;
        let wanted = self.source_rate();
        if let Some(source) = self.source.as_mut() {
            source.set_rate(wanted);
        }
        if self.reversed {
            self.needs_reset = self.has_video();
        }
    }

    /// Rate handed to the decoder: the magnitude of `rate`, negated when reversed.
    fn source_rate(&self) -> Rational {
        if self.reversed {
            let speed = self.rate.abs();
            Rational::new(-speed.num, speed.den)
        } else {
            self.rate
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Freeze or resume playback without changing the play state.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
        if let Some(source) = self.source.as_mut() {
            source.pause(paused);
        }
    }

    /// Native volume, 0..=255.
    pub fn set_volume(&mut self, volume: u8) {
        self.volume = volume;
        if let Some(source) = self.source.as_mut() {
            source.set_volume(volume);
        }
    }

    /// Begin playback. From a stopped position at the end bound, playback
    /// rewinds first; otherwise it resumes from the current timestamp.
    pub fn start(&mut self) {
        if self.state != PlayState::Stopped {
            return;
        }
        let real = self.real_range();
        if self.current == real.end(self.reversed) {
            self.current = real.start(self.reversed);
        }
        self.current = clock::clamp_to_range(self.current, real, self.reversed);
        self.state = PlayState::Playing;
        self.needs_reset = true;
    }

    /// Halt playback. The last frame stays cached and visible.
    pub fn stop(&mut self) {
        self.state = PlayState::Stopped;
        if let Some(source) = self.source.as_mut() {
            source.stop();
        }
    }

    /// Move to the start bound of the range.
    pub fn rewind(&mut self) {
        let real = self.real_range();
        self.seek(real.start(self.reversed));
    }

    /// Jump to `ts`. The decoder is repositioned on the next tick.
    pub fn seek(&mut self, ts: i64) {
        let real = self.real_range();
        self.current = clock::clamp_to_range(ts, real, self.reversed);
        self.needs_reset = true;
        if self.state == PlayState::PlayingLastFrame {
            self.state = PlayState::Playing;
        }
    }

    /// Advance one application frame.
    pub fn tick(&mut self) -> Vec<PlaybackEvent> {
        let mut events = Vec::new();
        if self.source.is_none() {
            return events;
        }

        if self.state == PlayState::PlayingLastFrame {
            // The final frame has been up for one tick
            if !self.paused {
                self.finish_range(&mut events);
            }
            return events;
        }

        if self.needs_reset {
            self.reset_source();
        }

        if self.state != PlayState::Playing || self.paused || self.reverse_stalled {
            return events;
        }

        self.decode_due_frames();

        let real = self.real_range();
        let end = real.end(self.reversed);
        let Some(source) = self.source.as_ref() else {
            return events;
        };
        let target = if source.end_of_video() {
            end
        } else {
            self.clock.to_external_rounded(source.time())
        };
        let target = target.clamp(real.min, real.max);

        if target != self.current {
            events.push(PlaybackEvent::TimeChanged {
                from: self.current,
                to: target,
            });
            self.current = target;
        }

        if self.current == end {
            if self.at_clip_bound(real) {
                self.state = PlayState::PlayingLastFrame;
            } else {
                self.finish_range(&mut events);
            }
        }

        events
    }

    /// Whether the range's end bound is also the clip's own bound.
    fn at_clip_bound(&self, real: PlayRange) -> bool {
        if self.reversed {
            real.min == 0
        } else {
            real.max == self.duration()
        }
    }

    fn finish_range(&mut self, events: &mut Vec<PlaybackEvent>) {
        events.push(PlaybackEvent::RangeEnd {
            reversed: self.reversed,
            looped: self.looping,
        });

        if self.looping {
            self.current = self.real_range().start(self.reversed);
            self.state = PlayState::Playing;
            self.needs_reset = true;
        } else {
            self.state = PlayState::Stopped;
            if let Some(source) = self.source.as_mut() {
                source.stop();
                source.pause(true);
            }
        }
    }

    /// Reposition the decoder at the current timestamp and decode one frame.
    fn reset_source(&mut self) {
        self.needs_reset = false;
        let real = self.real_range();
        let seek_to = self.clock.to_native(self.current);
        let playing = self.state != PlayState::Stopped;
        let paused = self.paused;
        let wanted = self.source_rate();
        let was_stalled = self.reverse_stalled;

        let Some(source) = self.source.as_mut() else {
            return;
        };
        if let Err(e) = source.seek(seek_to) {
            log::warn!("Seek to tick {} failed, disabling video: {e}", self.current);
            self.disable();
            return;
        }
        source.set_rate(wanted);
        let stalled = wanted.is_negative() && !source.rate().is_negative();
        let end_time = if stalled {
            self.clock.to_native(real.max)
        } else {
            self.clock.to_native(real.end(self.reversed))
        };
        source.set_end_time(end_time);
        if playing {
            source.pause(paused);
            if stalled {
                source.stop();
            } else {
                source.start();
            }
        }
        let decoded = source.decode_next_frame();

        if stalled && !was_stalled {
            log::warn!(
                "Decoder cannot play in reverse, holding at tick {}",
                self.current
            );
        }
        self.reverse_stalled = stalled;
        self.apply_decoded(decoded);
    }

    fn decode_due_frames(&mut self) {
        let Some(source) = self.source.as_mut() else {
            return;
        };
        let mut failure = None;
        while source.needs_update() {
            match source.decode_next_frame() {
                Ok(Some(frame)) => {
                    self.cache.update(frame);
                    if self.policy == FramePolicy::EveryFrame {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        if let Some(e) = failure {
            self.apply_decoded(Err(e));
        }
    }

    /// Cache a decoded frame. Corrupt frames are skipped; stream failures
    /// drop the source.
    fn apply_decoded(&mut self, decoded: Result<Option<Frame>, VideoError>) {
        match decoded {
            Ok(Some(frame)) => self.cache.update(frame),
            Ok(None) => {}
            Err(e) if e.disables_source() => {
                log::warn!("Decoder failed, disabling video: {e}");
                self.disable();
            }
            Err(e) => log::warn!("Skipping undecodable frame: {e}"),
        }
    }

    pub fn has_frame(&self) -> bool {
        self.source.is_some() && self.cache.has_frame()
    }

    /// Cached frame converted for `ctx`, or `None` when there's nothing to show.
    pub fn display_frame(&mut self, ctx: &RenderContext<'_>) -> Option<&Frame> {
        if self.source.is_none() {
            return None;
        }
        self.cache.display_frame(ctx)
    }

    /// Whether a new frame was decoded and not yet taken.
    pub fn frame_modified(&self) -> bool {
        self.cache.is_modified()
    }

    /// Whether a new frame was decoded since the last call.
    pub fn take_frame_modified(&mut self) -> bool {
        self.cache.take_modified()
    }
}
