use serde::{Deserialize, Serialize};

use super::palette::Palette;
use crate::media::types::{Frame, PixelFormat};

/// Screen-space rectangle. Origin may be negative (partially off-stage).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Target format and palette snapshot for one render pass.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub format: PixelFormat,
    pub palette: &'a Palette,
}

impl<'a> RenderContext<'a> {
    pub fn new(format: PixelFormat, palette: &'a Palette) -> Self {
        Self { format, palette }
    }
}

/// How a frame is fitted to element bounds that differ from its size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    /// Scale to fit while preserving aspect ratio, centred with bars.
    Letterbox,
}

impl ResizeFilter {
    /// Destination rect for a `frame_w`x`frame_h` frame inside `bounds`.
    pub fn fit(self, frame_w: u32, frame_h: u32, bounds: Rect) -> Rect {
        match self {
            ResizeFilter::Letterbox => letterbox_rect(frame_w, frame_h, bounds),
        }
    }
}

fn letterbox_rect(frame_w: u32, frame_h: u32, bounds: Rect) -> Rect {
    if frame_w == 0 || frame_h == 0 || bounds.is_empty() {
        return Rect::new(bounds.x, bounds.y, 0, 0);
    }

    let frame_aspect = f64::from(frame_w) / f64::from(frame_h);
    let bounds_aspect = f64::from(bounds.width) / f64::from(bounds.height);

    let (width, height) = if frame_aspect > bounds_aspect {
        // Wider than bounds: fit width, bars top/bottom
        let h = (f64::from(bounds.width) / frame_aspect).round() as u32;
        (bounds.width, h.clamp(1, bounds.height))
    } else {
        // Taller: fit height, bars left/right
        let w = (f64::from(bounds.height) * frame_aspect).round() as u32;
        (w.clamp(1, bounds.width), bounds.height)
    };

    let offset_x = (bounds.width - width) / 2;
    let offset_y = (bounds.height - height) / 2;

    Rect::new(
        bounds.x + offset_x as i32,
        bounds.y + offset_y as i32,
        width,
        height,
    )
}

/// An owned pixel buffer: the shared stage every element renders into.
#[derive(Debug, Clone)]
pub struct Surface {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pixels: Vec<u8>,
}

impl Surface {
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let len = (width as usize) * (height as usize) * format.bytes_per_pixel();
        Self {
            width,
            height,
            format,
            pixels: vec![0; len],
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Fill with zero (black / palette index 0).
    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// Raw pixel bytes at (x, y), `None` when outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bpp = self.format.bytes_per_pixel();
        let idx = ((y as usize) * (self.width as usize) + x as usize) * bpp;
        self.pixels.get(idx..idx + bpp)
    }

    /// Copy `frame` into `dest`, scaling nearest-neighbour if sizes differ and
    /// clipping to the surface. Returns false if the formats don't match.
    pub fn blit(&mut self, frame: &Frame, dest: Rect) -> bool {
        if frame.format != self.format {
            log::warn!(
                "Blit format mismatch: frame {:?}, surface {:?}",
                frame.format,
                self.format
            );
            return false;
        }
        if dest.is_empty() || frame.width == 0 || frame.height == 0 {
            return true;
        }
        if frame.data.len() < frame.expected_len() {
            log::warn!("Blit skipped: frame data truncated");
            return false;
        }

        let bpp = self.format.bytes_per_pixel();
        let surf_w = i64::from(self.width);
        let surf_h = i64::from(self.height);

        let x0 = i64::from(dest.x).max(0);
        let y0 = i64::from(dest.y).max(0);
        let x1 = (i64::from(dest.x) + i64::from(dest.width)).min(surf_w);
        let y1 = (i64::from(dest.y) + i64::from(dest.height)).min(surf_h);
        if x0 >= x1 || y0 >= y1 {
            return true;
        }

        let fw = i64::from(frame.width);
        let fh = i64::from(frame.height);
        let dw = i64::from(dest.width);
        let dh = i64::from(dest.height);

        for y in y0..y1 {
            let src_y = ((y - i64::from(dest.y)) * fh / dh) as usize;
            let dst_row = (y * surf_w) as usize;
            let src_row = src_y * frame.width as usize;
            if dw == fw {
                // Unscaled: copy the visible span of the row in one go
                let src_x = (x0 - i64::from(dest.x)) as usize;
                let count = (x1 - x0) as usize;
                let src = (src_row + src_x) * bpp;
                let dst = (dst_row + x0 as usize) * bpp;
                self.pixels[dst..dst + count * bpp]
                    .copy_from_slice(&frame.data[src..src + count * bpp]);
                continue;
            }
            for x in x0..x1 {
                let src_x = ((x - i64::from(dest.x)) * fw / dw) as usize;
                let src = (src_row + src_x) * bpp;
                let dst = (dst_row + x as usize) * bpp;
                self.pixels[dst..dst + bpp].copy_from_slice(&frame.data[src..src + bpp]);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::types::Rgba;

    const RED: Rgba = Rgba { r: 255, g: 0, b: 0, a: 255 };

    #[test]
    fn letterbox_wide_frame_gets_bars_top_bottom() {
        let r = ResizeFilter::Letterbox.fit(200, 100, Rect::new(0, 0, 100, 100));
        assert_eq!(r, Rect::new(0, 25, 100, 50));
    }

    #[test]
    fn letterbox_tall_frame_gets_bars_left_right() {
        let r = ResizeFilter::Letterbox.fit(50, 100, Rect::new(10, 10, 100, 100));
        assert_eq!(r, Rect::new(35, 10, 50, 100));
    }

    #[test]
    fn letterbox_empty_bounds() {
        let r = ResizeFilter::Letterbox.fit(50, 100, Rect::new(3, 4, 0, 10));
        assert!(r.is_empty());
    }

    #[test]
    fn surface_blit_unscaled_clips_to_surface() {
        let mut s = Surface::new(4, 4, PixelFormat::Rgba8);
        let frame = Frame::filled(2, 2, RED);
        assert!(s.blit(&frame, Rect::new(3, -1, 2, 2)));
        assert_eq!(s.pixel(3, 0), Some(&[255, 0, 0, 255][..]));
        assert_eq!(s.pixel(2, 0), Some(&[0, 0, 0, 0][..]));
        assert_eq!(s.pixel(3, 1), Some(&[0, 0, 0, 0][..]));
    }

    #[test]
    fn surface_blit_scales_nearest() {
        let mut s = Surface::new(4, 4, PixelFormat::Indexed8);
        let frame = Frame::indexed(2, 1, vec![7, 9], Palette::grayscale());
        assert!(s.blit(&frame, Rect::new(0, 0, 4, 2)));
        assert_eq!(s.pixel(0, 0), Some(&[7][..]));
        assert_eq!(s.pixel(1, 1), Some(&[7][..]));
        assert_eq!(s.pixel(2, 0), Some(&[9][..]));
        assert_eq!(s.pixel(3, 1), Some(&[9][..]));
        assert_eq!(s.pixel(0, 2), Some(&[0][..]));
    }

    #[test]
    fn surface_blit_rejects_format_mismatch() {
        let mut s = Surface::new(2, 2, PixelFormat::Indexed8);
        let frame = Frame::filled(1, 1, RED);
        assert!(!s.blit(&frame, Rect::new(0, 0, 1, 1)));
        assert!(s.pixels().iter().all(|&p| p == 0));
    }

    #[test]
    fn surface_clear_resets_pixels() {
        let mut s = Surface::new(2, 2, PixelFormat::Rgba8);
        s.blit(&Frame::filled(2, 2, RED), Rect::new(0, 0, 2, 2));
        s.clear();
        assert!(s.pixels().iter().all(|&p| p == 0));
        assert!(s.pixel(2, 0).is_none());
    }
}
