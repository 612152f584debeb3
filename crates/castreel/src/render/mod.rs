pub mod palette;
pub mod surface;

pub use palette::Palette;
pub use surface::{Rect, RenderContext, ResizeFilter, Surface};
