use std::path::PathBuf;

use thiserror::Error;

use crate::media::types::AssetKind;

/// Errors raised by the playback core.
///
/// None of these are fatal: adapters log them and degrade to "no video"
/// or ignore the offending command.
#[derive(Debug, Error)]
pub enum VideoError {
    #[error("media file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("unrecognized video container: {}", .0.display())]
    UnsupportedContainer(PathBuf),

    #[error("failed to decode {}: {reason}", .path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("frame {index} is corrupt: {reason}")]
    CorruptFrame { index: usize, reason: String },

    #[error("seek to {target} is outside 0..={duration}")]
    Seek { target: i64, duration: i64 },

    #[error("asset '{name}' is {found:?}, expected {expected:?}")]
    AssetMismatch {
        name: String,
        expected: AssetKind,
        found: AssetKind,
    },

    #[error("unknown attribute '{0}'")]
    UnknownAttribute(String),

    #[error("attribute '{0}' is read-only")]
    ReadOnlyAttribute(String),

    #[error("attribute '{name}' expects {expected}")]
    AttributeType { name: String, expected: &'static str },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error("GIF decode error: {0}")]
    Gif(#[from] gif::DecodingError),
}

impl VideoError {
    /// Whether the error leaves the video source permanently unusable.
    pub fn disables_source(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::UnsupportedContainer(_)
                | Self::Decode { .. }
                | Self::Seek { .. }
                | Self::Io(_)
                | Self::Image(_)
                | Self::Gif(_)
        )
    }
}
