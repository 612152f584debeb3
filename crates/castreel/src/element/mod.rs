pub mod def;
pub mod digital_video;
pub mod movie;
pub mod visual;

use serde::{Deserialize, Serialize};

use crate::error::VideoError;
use crate::media::decoder::OpenOptions;
use crate::media::types::AssetRef;
use crate::playback::controller::PlaybackEvent;
use crate::playback::cue::CueSet;
use crate::render::surface::{RenderContext, Surface};

pub use def::ElementDef;
pub use digital_video::DigitalVideoCastMember;
pub use movie::MovieElement;

/// Identifies an element within a scene.
pub type ElementId = u32;

/// Script-visible notifications. Only the emitting element is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementEvent {
    Shown,
    Hidden,
    Play,
    Stop,
    Pause,
    Unpause,
    AtFirstCel,
    AtLastCel,
    CueTriggered(u32),
}

impl ElementEvent {
    /// Transport events, i.e. everything except the visual base's Shown/Hidden.
    pub fn is_transport(self) -> bool {
        !matches!(self, ElementEvent::Shown | ElementEvent::Hidden)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementMessage {
    pub element: ElementId,
    pub event: ElementEvent,
}

/// Destination for element messages. Delivery is synchronous with the call
/// that produced the message.
pub trait MessageSink {
    fn post(&mut self, message: ElementMessage);

    fn emit(&mut self, element: ElementId, event: ElementEvent) {
        self.post(ElementMessage { element, event });
    }
}

impl MessageSink for Vec<ElementMessage> {
    fn post(&mut self, message: ElementMessage) {
        self.push(message);
    }
}

impl MessageSink for crossbeam_channel::Sender<ElementMessage> {
    fn post(&mut self, message: ElementMessage) {
        if self.send(message).is_err() {
            log::debug!("Message receiver gone, dropping {message:?}");
        }
    }
}

/// Scripting commands an element understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Play,
    Stop,
    Pause,
    Unpause,
    Show,
    Hide,
}

/// A scripting attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Int(i64),
    Bool(bool),
    Range(i64, i64),
}

impl AttrValue {
    pub fn as_int(self, name: &str) -> Result<i64, VideoError> {
        match self {
            AttrValue::Int(v) => Ok(v),
            _ => Err(type_error(name, "an integer")),
        }
    }

    /// Booleans also accept integers, non-zero meaning true.
    pub fn as_bool(self, name: &str) -> Result<bool, VideoError> {
        match self {
            AttrValue::Bool(v) => Ok(v),
            AttrValue::Int(v) => Ok(v != 0),
            AttrValue::Range(..) => Err(type_error(name, "a boolean")),
        }
    }

    pub fn as_range(self, name: &str) -> Result<(i64, i64), VideoError> {
        match self {
            AttrValue::Range(min, max) => Ok((min, max)),
            _ => Err(type_error(name, "an integer pair")),
        }
    }
}

fn type_error(name: &str, expected: &'static str) -> VideoError {
    VideoError::AttributeType {
        name: name.to_string(),
        expected,
    }
}

/// A scene element backed by a video asset.
///
/// Failures never escape: bad assets leave the element without video, and
/// commands against it are still accepted.
pub trait MediaElement {
    fn id(&self) -> ElementId;

    fn name(&self) -> &str;

    /// Bind a video source for `asset`.
    fn activate(&mut self, asset: &AssetRef, options: &OpenOptions);

    /// Release the video source and cached frames.
    fn deactivate(&mut self);

    fn has_video(&self) -> bool;

    fn is_playing(&self) -> bool;

    fn handle_command(&mut self, command: Command, sink: &mut dyn MessageSink);

    /// Advance playback by one application frame.
    fn tick(&mut self, sink: &mut dyn MessageSink);

    fn render(&mut self, surface: &mut Surface, ctx: &RenderContext<'_>);

    fn attribute(&self, name: &str) -> Result<AttrValue, VideoError>;

    /// Visibility and pause changes report their messages to `sink`.
    fn set_attribute(
        &mut self,
        name: &str,
        value: AttrValue,
        sink: &mut dyn MessageSink,
    ) -> Result<(), VideoError>;
}

/// Translate controller events into messages, checking cues on every move.
pub(crate) fn forward_playback_events(
    element: ElementId,
    events: &[PlaybackEvent],
    cues: &CueSet,
    sink: &mut dyn MessageSink,
) {
    for event in events {
        match *event {
            PlaybackEvent::TimeChanged { from, to } => {
                for cue in cues.crossed(from, to) {
                    sink.emit(element, ElementEvent::CueTriggered(cue.id));
                }
            }
            PlaybackEvent::RangeEnd { reversed, looped } => {
                if !looped {
                    sink.emit(element, ElementEvent::Stop);
                }
                let cel = if reversed {
                    ElementEvent::AtFirstCel
                } else {
                    ElementEvent::AtLastCel
                };
                sink.emit(element, cel);
            }
        }
    }
}

/// Scripting volume (0..=100) to native decoder volume (0..=255).
pub fn native_volume(volume: i64) -> u8 {
    let v = volume.clamp(0, 100);
    u8::try_from(v * 255 / 100).unwrap_or(u8::MAX)
}
