pub mod clock;
pub mod controller;
pub mod cue;
pub mod frame_cache;

pub use clock::{DEFAULT_EXTERNAL_TIME_SCALE, PlayRange, PlaybackClock};
pub use controller::{FramePolicy, PlayState, PlaybackEvent, VideoPlaybackController};
pub use cue::{CueSet, MediaCue};
pub use frame_cache::FrameCache;
