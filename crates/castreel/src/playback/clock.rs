use serde::{Deserialize, Serialize};

/// Ticks per second of the scripting-visible time base.
pub const DEFAULT_EXTERNAL_TIME_SCALE: u32 = 60;

/// Inclusive [min, max] span of a clip in external ticks.
///
/// `(0, 0)` is the "unset" sentinel meaning the whole clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayRange {
    pub min: i64,
    pub max: i64,
}

impl PlayRange {
    pub const UNSET: PlayRange = PlayRange { min: 0, max: 0 };

    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    pub fn is_unset(&self) -> bool {
        *self == Self::UNSET
    }

    pub fn contains(&self, ts: i64) -> bool {
        ts >= self.min && ts <= self.max
    }

    /// Bound playback moves toward.
    pub fn end(&self, reversed: bool) -> i64 {
        if reversed { self.min } else { self.max }
    }

    /// Bound playback starts from.
    pub fn start(&self, reversed: bool) -> i64 {
        if reversed { self.max } else { self.min }
    }
}

/// Effective range for a raw (script-set) range over a clip of `duration` ticks.
///
/// Both ends are clamped into `[0, duration]`; if the max then lies below the
/// min it is raised to the min, so `(5, 2)` plays as the single tick `(5, 5)`.
pub fn compute_real_range(raw: PlayRange, duration: i64) -> PlayRange {
    let duration = duration.max(0);
    if raw.is_unset() {
        return PlayRange::new(0, duration);
    }
    let min = raw.min.clamp(0, duration);
    let mut max = raw.max.clamp(0, duration);
    if max < min {
        max = min;
    }
    PlayRange::new(min, max)
}

/// Snap an out-of-range timestamp to the start of playback: `max` when
/// reversed, `min` otherwise. In-range timestamps are returned unchanged.
pub fn clamp_to_range(ts: i64, range: PlayRange, reversed: bool) -> i64 {
    if range.contains(ts) {
        ts
    } else {
        range.start(reversed)
    }
}

/// Converts between external ticks and a source's native time base.
///
/// Seeks go external -> native with floor; readback goes native -> external
/// rounding to nearest. Mixing the two keeps the readback from oscillating
/// across a tick boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackClock {
    external_scale: u32,
    native_scale: u32,
}

impl PlaybackClock {
    pub fn new(external_scale: u32, native_scale: u32) -> Self {
        Self {
            external_scale: external_scale.max(1),
            native_scale: native_scale.max(1),
        }
    }

    pub fn external_scale(&self) -> u32 {
        self.external_scale
    }

    pub fn native_scale(&self) -> u32 {
        self.native_scale
    }

    pub fn set_native_scale(&mut self, native_scale: u32) {
        self.native_scale = native_scale.max(1);
    }

    /// External ticks to native units, floor.
    pub fn to_native(&self, external: i64) -> i64 {
        (external * i64::from(self.native_scale)).div_euclid(i64::from(self.external_scale))
    }

    /// Native units to external ticks, floor. Used for durations.
    pub fn to_external(&self, native: i64) -> i64 {
        (native * i64::from(self.external_scale)).div_euclid(i64::from(self.native_scale))
    }

    /// Native units to external ticks, rounded to nearest (half up). Used for
    /// reading back decoder position.
    pub fn to_external_rounded(&self, native: i64) -> i64 {
        let ns = i64::from(self.native_scale);
        (2 * native * i64::from(self.external_scale) + ns).div_euclid(2 * ns)
    }
}
