use super::{ElementEvent, ElementId, MessageSink};
use crate::media::types::Frame;
use crate::render::surface::{Rect, ResizeFilter, Surface};

/// Visibility and placement shared by every visual element.
///
/// Owns the Shown/Hidden messages so media adapters never emit them directly.
#[derive(Debug, Clone)]
pub struct VisualState {
    visible: bool,
    pub rect: Rect,
    pub resize: Option<ResizeFilter>,
}

impl VisualState {
    pub fn new(visible: bool, rect: Rect, resize: Option<ResizeFilter>) -> Self {
        Self {
            visible,
            rect,
            resize,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn show(&mut self, element: ElementId, sink: &mut dyn MessageSink) {
        self.set_visible(element, true, sink);
    }

    pub fn hide(&mut self, element: ElementId, sink: &mut dyn MessageSink) {
        self.set_visible(element, false, sink);
    }

    /// Change visibility, emitting Shown/Hidden only on an actual change.
    pub fn set_visible(&mut self, element: ElementId, visible: bool, sink: &mut dyn MessageSink) {
        if self.visible == visible {
            return;
        }
        self.visible = visible;
        let event = if visible {
            ElementEvent::Shown
        } else {
            ElementEvent::Hidden
        };
        sink.emit(element, event);
    }

    /// Where `frame` lands on the stage. Without a resize filter the frame is
    /// drawn at its own size from the element origin.
    pub fn dest_rect(&self, frame: &Frame) -> Rect {
        match self.resize {
            Some(filter) if !self.rect.is_empty() => filter.fit(frame.width, frame.height, self.rect),
            _ => Rect::new(self.rect.x, self.rect.y, frame.width, frame.height),
        }
    }

    /// Draw `frame` if visible.
    pub fn blit(&self, surface: &mut Surface, frame: &Frame) {
        if !self.visible {
            return;
        }
        surface.blit(frame, self.dest_rect(frame));
    }
}
