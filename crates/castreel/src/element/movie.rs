use serde::{Deserialize, Serialize};

use super::visual::VisualState;
use super::{
    AttrValue, Command, ElementEvent, ElementId, MediaElement, MessageSink,
    forward_playback_events, native_volume,
};
use crate::error::VideoError;
use crate::media::decoder::OpenOptions;
use crate::media::source::VideoSource;
use crate::media::types::{AssetKind, AssetRef};
use crate::playback::clock::PlayRange;
use crate::playback::controller::{FramePolicy, VideoPlaybackController};
use crate::playback::cue::{CueSet, MediaCue};
use crate::render::surface::{Rect, RenderContext, ResizeFilter, Surface};

fn default_true() -> bool {
    true
}

fn default_volume() -> u8 {
    100
}

/// Serialized form of a movie element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieDef {
    pub id: ElementId,
    #[serde(default)]
    pub name: String,
    pub asset: AssetRef,
    #[serde(default)]
    pub rect: Rect,
    #[serde(default)]
    pub resize: Option<ResizeFilter>,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default, rename = "loop")]
    pub looping: bool,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub reversed: bool,
    /// Play every frame instead of dropping late ones.
    #[serde(default)]
    pub alternate: bool,
    /// 0..=100
    #[serde(default = "default_volume")]
    pub volume: u8,
    #[serde(default)]
    pub range: PlayRange,
    #[serde(default)]
    pub cues: Vec<MediaCue>,
}

impl MovieDef {
    pub fn new(id: ElementId, asset: AssetRef) -> Self {
        Self {
            id,
            name: String::new(),
            asset,
            rect: Rect::default(),
            resize: None,
            visible: true,
            looping: false,
            paused: false,
            reversed: false,
            alternate: false,
            volume: default_volume(),
            range: PlayRange::UNSET,
            cues: Vec::new(),
        }
    }
}

/// Movie element with pause-aware transport and cue points.
pub struct MovieElement {
    id: ElementId,
    name: String,
    visual: VisualState,
    controller: VideoPlaybackController,
    cues: CueSet,
    paused: bool,
    volume: u8,
}

impl MovieElement {
    pub fn new(def: &MovieDef, external_scale: u32) -> Self {
        let mut controller = VideoPlaybackController::new(external_scale);
        controller.set_looping(def.looping);
        controller.set_reversed(def.reversed);
        controller.set_play_range(def.range);
        controller.set_frame_policy(if def.alternate {
            FramePolicy::EveryFrame
        } else {
            FramePolicy::Normal
        });
        controller.set_paused(def.paused);
        let volume = def.volume.min(100);
        controller.set_volume(native_volume(i64::from(volume)));

        Self {
            id: def.id,
            name: def.name.clone(),
            visual: VisualState::new(def.visible, def.rect, def.resize),
            controller,
            cues: def.cues.iter().copied().collect(),
            paused: def.paused,
            volume,
        }
    }

    /// Bind an already-opened source, bypassing asset lookup.
    pub fn attach_source(&mut self, source: Box<dyn VideoSource>) {
        self.controller.attach(source);
    }

    pub fn controller(&self) -> &VideoPlaybackController {
        &self.controller
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_visible(&self) -> bool {
        self.visual.is_visible()
    }

    pub fn add_cue(&mut self, cue: MediaCue) {
        self.cues.insert(cue);
    }

    fn pause(&mut self, sink: &mut dyn MessageSink) {
        if !self.paused {
            self.paused = true;
            self.controller.set_paused(true);
            sink.emit(self.id, ElementEvent::Pause);
        }
    }

    fn unpause(&mut self, sink: &mut dyn MessageSink) {
        if self.paused {
            self.paused = false;
            self.controller.set_paused(false);
            sink.emit(self.id, ElementEvent::Unpause);
        }
    }

    fn play(&mut self, sink: &mut dyn MessageSink) {
        self.visual.show(self.id, sink);
        self.unpause(sink);
        self.controller.stop();
        self.controller.start();
        sink.emit(self.id, ElementEvent::Play);
    }

    fn stop(&mut self, sink: &mut dyn MessageSink) {
        self.pause(sink);
        self.visual.hide(self.id, sink);
        sink.emit(self.id, ElementEvent::Pause);
        self.controller.stop();
    }
}

impl MediaElement for MovieElement {
    fn id(&self) -> ElementId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn activate(&mut self, asset: &AssetRef, options: &OpenOptions) {
        if asset.kind != AssetKind::Movie {
            let err = VideoError::AssetMismatch {
                name: asset.name.clone(),
                expected: AssetKind::Movie,
                found: asset.kind,
            };
            log::warn!("Movie element {}: {err}", self.id);
            return;
        }
        match self.controller.load(&asset.path, options) {
            Ok(()) => {
                let (w, h) = self.controller.frame_size();
                log::info!(
                    "Movie element {} loaded {} ({}, {w}x{h}, {} ticks)",
                    self.id,
                    asset.path.display(),
                    self.controller.container().display_name(),
                    self.controller.duration()
                );
            }
            Err(e) => log::warn!("Movie element {} has no video: {e}", self.id),
        }
    }

    fn deactivate(&mut self) {
        self.controller.unload();
    }

    fn has_video(&self) -> bool {
        self.controller.has_video()
    }

    fn is_playing(&self) -> bool {
        self.controller.is_playing()
    }

    fn handle_command(&mut self, command: Command, sink: &mut dyn MessageSink) {
        match command {
            Command::Play => self.play(sink),
            Command::Stop => self.stop(sink),
            Command::Pause => self.pause(sink),
            Command::Unpause => self.unpause(sink),
            Command::Show => self.visual.show(self.id, sink),
            Command::Hide => self.visual.hide(self.id, sink),
        }
    }

    fn tick(&mut self, sink: &mut dyn MessageSink) {
        let events = self.controller.tick();
        forward_playback_events(self.id, &events, &self.cues, sink);
    }

    fn render(&mut self, surface: &mut Surface, ctx: &RenderContext<'_>) {
        if !self.visual.is_visible() {
            return;
        }
        if let Some(frame) = self.controller.display_frame(ctx) {
            self.visual.blit(surface, frame);
        }
    }

    fn attribute(&self, name: &str) -> Result<AttrValue, VideoError> {
        let range = self.controller.play_range();
        Ok(match name.to_ascii_lowercase().as_str() {
            "range" => AttrValue::Range(range.min, range.max),
            "timevalue" => AttrValue::Int(self.controller.current_timestamp()),
            "timescale" => AttrValue::Int(i64::from(self.controller.clock().native_scale())),
            "volume" => AttrValue::Int(i64::from(self.volume)),
            "loop" => AttrValue::Bool(self.controller.looping()),
            "paused" => AttrValue::Bool(self.paused),
            "visible" => AttrValue::Bool(self.visual.is_visible()),
            "reversed" => AttrValue::Bool(self.controller.reversed()),
            _ => return Err(VideoError::UnknownAttribute(name.to_string())),
        })
    }

    fn set_attribute(
        &mut self,
        name: &str,
        value: AttrValue,
        sink: &mut dyn MessageSink,
    ) -> Result<(), VideoError> {
        match name.to_ascii_lowercase().as_str() {
            "range" => {
                let (min, max) = value.as_range(name)?;
                self.controller.set_play_range(PlayRange::new(min, max));
            }
            "timevalue" => self.controller.seek(value.as_int(name)?),
            "volume" => {
                let volume = value.as_int(name)?.clamp(0, 100);
                self.volume = u8::try_from(volume).unwrap_or(100);
                self.controller.set_volume(native_volume(volume));
            }
            "loop" => self.controller.set_looping(value.as_bool(name)?),
            "paused" => {
                if value.as_bool(name)? {
                    self.pause(sink);
                } else {
                    self.unpause(sink);
                }
            }
            "visible" => {
                let visible = value.as_bool(name)?;
                self.visual.set_visible(self.id, visible, sink);
            }
            "timescale" | "reversed" => {
                return Err(VideoError::ReadOnlyAttribute(name.to_string()));
            }
            _ => return Err(VideoError::UnknownAttribute(name.to_string())),
        }
        Ok(())
    }
}
