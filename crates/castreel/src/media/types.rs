use std::fmt;
use std::path::PathBuf;

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::render::palette::Palette;

/// Pixel layout of a frame or surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 32-bit RGBA, 4 bytes per pixel.
    Rgba8,
    /// 8-bit palette indices, 1 byte per pixel.
    Indexed8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
            PixelFormat::Indexed8 => 1,
        }
    }
}

/// One RGBA pixel, castable from raw frame bytes.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Pod, Zeroable)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// A decoded frame, either in a decoder's native layout or converted for display.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Palette the indices refer to. Only meaningful for `Indexed8` frames.
    pub palette: Option<Palette>,
}

impl Frame {
    pub fn rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            data,
            width,
            height,
            format: PixelFormat::Rgba8,
            palette: None,
        }
    }

    pub fn indexed(width: u32, height: u32, data: Vec<u8>, palette: Palette) -> Self {
        Self {
            data,
            width,
            height,
            format: PixelFormat::Indexed8,
            palette: Some(palette),
        }
    }

    /// Solid-colour RGBA frame.
    pub fn filled(width: u32, height: u32, color: Rgba) -> Self {
        let pixels = vec![color; (width as usize) * (height as usize)];
        Self::rgba(width, height, bytemuck::cast_slice(pixels.as_slice()).to_vec())
    }

    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Byte length implied by dimensions and format.
    pub fn expected_len(&self) -> usize {
        self.pixel_count() * self.format.bytes_per_pixel()
    }

    pub fn is_well_formed(&self) -> bool {
        self.data.len() == self.expected_len()
            && (self.format == PixelFormat::Rgba8 || self.palette.is_some())
    }

    /// View RGBA data as pixels. `None` for indexed or truncated frames.
    pub fn rgba_pixels(&self) -> Option<&[Rgba]> {
        if self.format != PixelFormat::Rgba8 {
            return None;
        }
        bytemuck::try_cast_slice(&self.data).ok()
    }
}

/// Signed playback rate. Zero pauses, negative requests reverse playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rational {
    pub num: i32,
    pub den: u32,
}

impl Rational {
    pub const ONE: Rational = Rational { num: 1, den: 1 };
    pub const ZERO: Rational = Rational { num: 0, den: 1 };

    pub fn new(num: i32, den: u32) -> Self {
        Self {
            num,
            den: den.max(1),
        }
    }

    pub fn is_zero(self) -> bool {
        self.num == 0
    }

    pub fn is_negative(self) -> bool {
        self.num < 0
    }

    pub fn abs(self) -> Self {
        Self::new(self.num.saturating_abs(), self.den)
    }

    /// Scale an integer amount by this rate, rounding toward zero.
    pub fn scale(self, value: i64) -> i64 {
        value * i64::from(self.num) / i64::from(self.den.max(1))
    }
}

impl Default for Rational {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Container detected by trial loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerKind {
    AnimatedGif,
    ImageSequence,
    /// Trial load failed; the source is permanently unusable.
    Unknown,
}

impl ContainerKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            ContainerKind::AnimatedGif => "GIF",
            ContainerKind::ImageSequence => "Image sequence",
            ContainerKind::Unknown => "Unknown",
        }
    }
}

/// Kind of asset an element can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Movie,
    Audio,
    Image,
    Text,
}

/// Reference to a media asset as stored in scene data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRef {
    pub name: String,
    pub path: PathBuf,
    #[serde(default = "default_asset_kind")]
    pub kind: AssetKind,
}

fn default_asset_kind() -> AssetKind {
    AssetKind::Movie
}

impl AssetRef {
    pub fn movie(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        Self {
            name,
            path,
            kind: AssetKind::Movie,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_filled_is_well_formed() {
        let frame = Frame::filled(3, 2, Rgba { r: 1, g: 2, b: 3, a: 255 });
        assert_eq!(frame.data.len(), 24);
        assert!(frame.is_well_formed());
        assert_eq!(frame.rgba_pixels().map(<[Rgba]>::len), Some(6));
    }

    #[test]
    fn frame_indexed_needs_palette() {
        let mut frame = Frame::indexed(2, 2, vec![0; 4], Palette::grayscale());
        assert!(frame.is_well_formed());
        assert!(frame.rgba_pixels().is_none());
        frame.palette = None;
        assert!(!frame.is_well_formed());
    }

    #[test]
    fn rational_scale_and_sign() {
        let half = Rational::new(1, 2);
        assert_eq!(half.scale(100), 50);
        assert!(!half.is_negative());
        assert!(Rational::new(-1, 1).is_negative());
        assert!(Rational::ZERO.is_zero());
        assert_eq!(Rational::new(3, 0).den, 1);
        assert_eq!(Rational::new(-2, 3).abs(), Rational::new(2, 3));
    }

    #[test]
    fn asset_ref_movie_uses_file_name() {
        let asset = AssetRef::movie("/cd/movies/intro.gif");
        assert_eq!(asset.name, "intro.gif");
        assert_eq!(asset.kind, AssetKind::Movie);
    }
}
