pub mod decoder;
pub mod source;
pub mod types;

pub use decoder::{OpenOptions, open_video};
pub use source::{MediaClock, SystemClock, VideoSource};
pub use types::{AssetKind, AssetRef, ContainerKind, Frame, PixelFormat, Rational};
