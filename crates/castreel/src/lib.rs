//! Tick-driven video playback for scene elements: trial-loaded decoders, an
//! external/native clock, a display-format frame cache and the element
//! adapters that turn playback into script messages.

pub mod element;
pub mod error;
pub mod media;
pub mod playback;
pub mod render;
pub mod settings;

#[cfg(test)]
pub(crate) mod testing;

pub use error::VideoError;
