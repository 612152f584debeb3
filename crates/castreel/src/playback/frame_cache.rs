use crate::media::types::{Frame, PixelFormat};
use crate::render::palette::{Palette, Quantizer};
use crate::render::surface::RenderContext;

/// Most recently decoded frame plus its display-format conversion.
///
/// The conversion is built lazily on first render after each `update`, using
/// the palette in effect at that moment rather than at decode time.
#[derive(Debug, Default)]
pub struct FrameCache {
    last: Option<Frame>,
    display: Option<Frame>,
    modified: bool,
}

impl FrameCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a freshly decoded frame and drop the stale conversion.
    pub fn update(&mut self, frame: Frame) {
        self.last = Some(frame);
        self.display = None;
        self.modified = true;
    }

    pub fn clear(&mut self) {
        self.last = None;
        self.display = None;
        self.modified = false;
    }

    pub fn has_frame(&self) -> bool {
        self.last.is_some()
    }

    /// The frame converted to `ctx.format`, converting at most once per update.
    pub fn display_frame(&mut self, ctx: &RenderContext<'_>) -> Option<&Frame> {
        let last = self.last.as_ref()?;
        let stale = self
            .display
            .as_ref()
            .is_none_or(|d| d.format != ctx.format);
        if stale {
            self.display = Some(convert_frame(last, ctx.format, ctx.palette));
        }
        self.display.as_ref()
    }

    /// True once per update: whether a new frame arrived since the last call.
    pub fn take_modified(&mut self) -> bool {
        std::mem::take(&mut self.modified)
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }
}

/// Convert `frame` to `format`, mapping colours onto `palette` for indexed targets.
pub fn convert_frame(frame: &Frame, format: PixelFormat, palette: &Palette) -> Frame {
    match (frame.format, format) {
        (PixelFormat::Rgba8, PixelFormat::Rgba8) => frame.clone(),
        (PixelFormat::Indexed8, PixelFormat::Rgba8) => {
            let source = frame.palette.as_ref().unwrap_or(palette);
            let mut data = Vec::with_capacity(frame.pixel_count() * 4);
            for &index in &frame.data {
                let [r, g, b] = source.color(index);
                data.extend_from_slice(&[r, g, b, 255]);
            }
            Frame::rgba(frame.width, frame.height, data)
        }
        (PixelFormat::Rgba8, PixelFormat::Indexed8) => {
            let mut quantizer = Quantizer::new(palette);
            let data: Vec<u8> = frame
                .rgba_pixels()
                .map(|pixels| {
                    pixels
                        .iter()
                        .map(|p| quantizer.index_of([p.r, p.g, p.b]))
                        .collect()
                })
                .unwrap_or_else(|| vec![0; frame.pixel_count()]);
            Frame::indexed(frame.width, frame.height, data, palette.clone())
        }
        (PixelFormat::Indexed8, PixelFormat::Indexed8) => {
            let data = match frame.palette.as_ref() {
                Some(source) if source != palette => {
                    // Remap through a 256-entry table instead of per pixel
                    let mut quantizer = Quantizer::new(palette);
                    let table: Vec<u8> = (0..=255u8)
                        .map(|i| quantizer.index_of(source.color(i)))
                        .collect();
                    frame.data.iter().map(|&i| table[usize::from(i)]).collect()
                }
                _ => frame.data.clone(),
            };
            Frame::indexed(frame.width, frame.height, data, palette.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::types::Rgba;

    const RED: Rgba = Rgba { r: 255, g: 0, b: 0, a: 255 };

    fn two_color() -> Palette {
        Palette::new(vec![[0, 0, 0], [255, 0, 0]])
    }

    #[test]
    fn cache_empty_has_no_display_frame() {
        let mut cache = FrameCache::new();
        let palette = Palette::system();
        let ctx = RenderContext::new(PixelFormat::Rgba8, &palette);
        assert!(cache.display_frame(&ctx).is_none());
        assert!(!cache.has_frame());
    }

    #[test]
    fn cache_rgba_passthrough() {
        let mut cache = FrameCache::new();
        cache.update(Frame::filled(2, 2, RED));
        let palette = Palette::system();
        let ctx = RenderContext::new(PixelFormat::Rgba8, &palette);
        let frame = cache.display_frame(&ctx).unwrap();
        assert_eq!(frame.format, PixelFormat::Rgba8);
        assert_eq!(&frame.data[..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn cache_quantizes_for_paletted_target() {
        let mut cache = FrameCache::new();
        cache.update(Frame::filled(2, 1, RED));
        let palette = two_color();
        let ctx = RenderContext::new(PixelFormat::Indexed8, &palette);
        let frame = cache.display_frame(&ctx).unwrap();
        assert_eq!(frame.format, PixelFormat::Indexed8);
        assert_eq!(frame.data, vec![1, 1]);
    }

    #[test]
    fn cache_palette_captured_at_render_not_decode() {
        let mut cache = FrameCache::new();
        cache.update(Frame::filled(1, 1, RED));

        // Palette changes between decode and first render
        let first = Palette::new(vec![[255, 0, 0], [0, 0, 0]]);
        let ctx = RenderContext::new(PixelFormat::Indexed8, &first);
        assert_eq!(cache.display_frame(&ctx).unwrap().data, vec![0]);

        // Same format again reuses the conversion even if the palette moved on
        let second = two_color();
        let ctx = RenderContext::new(PixelFormat::Indexed8, &second);
        assert_eq!(cache.display_frame(&ctx).unwrap().data, vec![0]);

        // A new frame picks up the current palette
        cache.update(Frame::filled(1, 1, RED));
        assert_eq!(cache.display_frame(&ctx).unwrap().data, vec![1]);
    }

    #[test]
    fn cache_format_change_reconverts() {
        let mut cache = FrameCache::new();
        cache.update(Frame::indexed(1, 1, vec![1], two_color()));
        let palette = Palette::grayscale();
        let rgba = RenderContext::new(PixelFormat::Rgba8, &palette);
        assert_eq!(cache.display_frame(&rgba).unwrap().data, vec![255, 0, 0, 255]);
        let indexed = RenderContext::new(PixelFormat::Indexed8, &palette);
        let frame = cache.display_frame(&indexed).unwrap();
        assert_eq!(frame.format, PixelFormat::Indexed8);
        assert_eq!(frame.data, vec![palette.nearest([255, 0, 0])]);
    }

    #[test]
    fn cache_indexed_same_palette_copies_indices() {
        let palette = two_color();
        let frame = Frame::indexed(2, 1, vec![0, 1], palette.clone());
        let converted = convert_frame(&frame, PixelFormat::Indexed8, &palette);
        assert_eq!(converted.data, vec![0, 1]);
    }

    #[test]
    fn cache_modified_flag_is_taken_once() {
        let mut cache = FrameCache::new();
        assert!(!cache.take_modified());
        cache.update(Frame::filled(1, 1, RED));
        assert!(cache.is_modified());
        assert!(cache.take_modified());
        assert!(!cache.take_modified());
        cache.clear();
        assert!(!cache.has_frame());
    }
}
