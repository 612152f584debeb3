use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::media::decoder::OpenOptions;
use crate::playback::clock::DEFAULT_EXTERNAL_TIME_SCALE;
use crate::playback::controller::FramePolicy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub version: u32,
    /// Ticks per second of script-visible time.
    pub external_time_scale: u32,
    pub play_every_frame: bool,
    /// Frame rate assumed for image sequences.
    pub sequence_fps: u32,
    /// 0..=100
    pub default_volume: u8,
    pub stage_width: u32,
    pub stage_height: u32,
    /// Render into an 8-bit indexed stage instead of RGBA.
    pub paletted_stage: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            version: 1,
            external_time_scale: DEFAULT_EXTERNAL_TIME_SCALE,
            play_every_frame: false,
            sequence_fps: 15,
            default_volume: 100,
            stage_width: 640,
            stage_height: 480,
            paletted_stage: false,
        }
    }
}

impl PlayerConfig {
    /// Default location: `<config dir>/castreel/player.json`.
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("castreel").join("player.json"))
    }

    pub fn load() -> Self {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Read `path`, falling back to defaults if it's missing or malformed.
    pub fn load_from(path: &Path) -> Self {
        let Ok(json) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&json) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Ignoring malformed config {}: {e}", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self) {
        if let Some(path) = Self::path() {
            self.save_to(&path);
        }
    }

    pub fn save_to(&self, path: &Path) {
        if let Some(dir) = path.parent()
            && let Err(e) = std::fs::create_dir_all(dir)
        {
            log::error!("Failed to create {}: {e}", dir.display());
            return;
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(path, json) {
                    log::error!("Failed to write {}: {e}", path.display());
                }
            }
            Err(e) => log::error!("Failed to serialize config: {e}"),
        }
    }

    pub fn open_options(&self) -> OpenOptions {
        OpenOptions {
            sequence_fps: self.sequence_fps,
        }
    }

    pub fn frame_policy(&self) -> FramePolicy {
        if self.play_every_frame {
            FramePolicy::EveryFrame
        } else {
            FramePolicy::Normal
        }
    }
}
