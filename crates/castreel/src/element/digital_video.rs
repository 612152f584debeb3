use serde::{Deserialize, Serialize};

use super::visual::VisualState;
use super::{
    AttrValue, Command, ElementEvent, ElementId, MediaElement, MessageSink,
    forward_playback_events, native_volume,
};
use crate::error::VideoError;
use crate::media::decoder::OpenOptions;
use crate::media::source::VideoSource;
use crate::media::types::{AssetKind, AssetRef, Frame, Rational};
use crate::playback::controller::{FramePolicy, VideoPlaybackController};
use crate::playback::cue::{CueSet, MediaCue};
use crate::render::surface::{Rect, RenderContext, ResizeFilter, Surface};

fn default_true() -> bool {
    true
}

fn default_volume() -> u8 {
    100
}

/// Cast-member flags for a digital video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigitalVideoProps {
    #[serde(default, rename = "loop")]
    pub looping: bool,
    #[serde(default)]
    pub paused_at_start: bool,
    #[serde(default = "default_true")]
    pub video: bool,
    #[serde(default = "default_true")]
    pub sound: bool,
    #[serde(default)]
    pub crop: bool,
    #[serde(default)]
    pub center: bool,
    #[serde(default)]
    pub direct_to_stage: bool,
    #[serde(default)]
    pub pre_load: bool,
    /// 0 plays at normal speed; anything else plays every frame.
    #[serde(default)]
    pub frame_rate: i64,
}

impl Default for DigitalVideoProps {
    fn default() -> Self {
        Self {
            looping: false,
            paused_at_start: false,
            video: true,
            sound: true,
            crop: false,
            center: false,
            direct_to_stage: false,
            pre_load: false,
            frame_rate: 0,
        }
    }
}

/// Serialized form of a digital video cast member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigitalVideoDef {
    pub id: ElementId,
    #[serde(default)]
    pub name: String,
    pub asset: AssetRef,
    #[serde(default)]
    pub rect: Rect,
    #[serde(default)]
    pub resize: Option<ResizeFilter>,
    #[serde(flatten)]
    pub props: DigitalVideoProps,
    /// 0..=100
    #[serde(default = "default_volume")]
    pub volume: u8,
}

impl DigitalVideoDef {
    pub fn new(id: ElementId, asset: AssetRef) -> Self {
        Self {
            id,
            name: String::new(),
            asset,
            rect: Rect::default(),
            resize: None,
            props: DigitalVideoProps::default(),
            volume: default_volume(),
        }
    }
}

/// Digital video cast member driven by its cast properties.
pub struct DigitalVideoCastMember {
    id: ElementId,
    name: String,
    visual: VisualState,
    controller: VideoPlaybackController,
    props: DigitalVideoProps,
    volume: u8,
    movie_rate: Rational,
    cues: CueSet,
}

impl DigitalVideoCastMember {
    pub fn new(def: &DigitalVideoDef, external_scale: u32) -> Self {
        let mut member = Self {
            id: def.id,
            name: def.name.clone(),
            visual: VisualState::new(true, def.rect, def.resize),
            controller: VideoPlaybackController::new(external_scale),
            props: def.props,
            volume: def.volume.min(100),
            movie_rate: Rational::ONE,
            cues: CueSet::new(),
        };
        member.controller.set_looping(def.props.looping);
        member.apply_frame_rate();
        member.apply_volume();
        member
    }

    /// Open `asset` and start it unless paused at start. Returns whether video is available.
    pub fn load_video(&mut self, asset: &AssetRef, options: &OpenOptions) -> bool {
        if asset.kind != AssetKind::Movie {
            let err = VideoError::AssetMismatch {
                name: asset.name.clone(),
                expected: AssetKind::Movie,
                found: asset.kind,
            };
            log::warn!("Digital video {}: {err}", self.id);
            return false;
        }
        if let Err(e) = self.controller.load(&asset.path, options) {
            log::warn!("Digital video {} failed to load: {e}", self.id);
            return false;
        }
        log::info!(
            "Digital video {} loaded {} ({}, {} ticks)",
            self.id,
            asset.path.display(),
            self.controller.container().display_name(),
            self.controller.duration()
        );
        self.after_load();
        true
    }

    /// Bind an already-opened source and apply the start-up properties.
    pub fn attach_source(&mut self, source: Box<dyn VideoSource>) {
        self.controller.attach(source);
        self.after_load();
    }

    fn after_load(&mut self) {
        self.apply_volume();
        if !self.props.paused_at_start {
            self.start_video();
        }
    }

    pub fn start_video(&mut self) {
        self.controller.start();
    }

    pub fn stop_video(&mut self) {
        self.controller.stop();
    }

    pub fn rewind_video(&mut self) {
        self.controller.rewind();
    }

    /// A frame was decoded that hasn't been rendered yet.
    pub fn is_modified(&self) -> bool {
        self.controller.frame_modified()
    }

    pub fn add_cue(&mut self, cue: MediaCue) {
        self.cues.insert(cue);
    }

    pub fn controller(&self) -> &VideoPlaybackController {
        &self.controller
    }

    pub fn props(&self) -> &DigitalVideoProps {
        &self.props
    }

    pub fn movie_rate(&self) -> Rational {
        self.movie_rate
    }

    /// 0 pauses; any other rate resumes playback at that rate.
    pub fn set_movie_rate(&mut self, rate: Rational) {
        self.movie_rate = rate;
        if rate.is_zero() {
            self.controller.set_paused(true);
            return;
        }
        self.controller.set_rate(rate);
        self.controller.set_paused(false);
        self.controller.start();
    }

    fn apply_frame_rate(&mut self) {
        let policy = if self.props.frame_rate == 0 {
            FramePolicy::Normal
        } else {
            FramePolicy::EveryFrame
        };
        self.controller.set_frame_policy(policy);
    }

    fn apply_volume(&mut self) {
        let volume = if self.props.sound { self.volume } else { 0 };
        self.controller.set_volume(native_volume(i64::from(volume)));
    }
}

/// Cropped and centred video sits at native size in the middle of its rect.
fn placement(props: &DigitalVideoProps, visual: &VisualState, frame: &Frame) -> Rect {
    let rect = visual.rect;
    if props.crop && props.center && !rect.is_empty() {
        let x = rect.x + (i64::from(rect.width) - i64::from(frame.width)) as i32 / 2;
        let y = rect.y + (i64::from(rect.height) - i64::from(frame.height)) as i32 / 2;
        return Rect::new(x, y, frame.width, frame.height);
    }
    visual.dest_rect(frame)
}

impl MediaElement for DigitalVideoCastMember {
    fn id(&self) -> ElementId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn activate(&mut self, asset: &AssetRef, options: &OpenOptions) {
        self.load_video(asset, options);
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
            Command::Play => {
                self.start_video();
                sink.emit(self.id, ElementEvent::Play);
            }
            Command::Stop => {
                self.stop_video();
                sink.emit(self.id, ElementEvent::Stop);
            }
            Command::Pause => {
                if !self.controller.is_paused() {
                    self.controller.set_paused(true);
                    sink.emit(self.id, ElementEvent::Pause);
                }
            }
            Command::Unpause => {
                if self.controller.is_paused() {
                    self.controller.set_paused(false);
                    sink.emit(self.id, ElementEvent::Unpause);
                }
            }
            Command::Show => self.visual.show(self.id, sink),
            Command::Hide => self.visual.hide(self.id, sink),
        }
    }

    fn tick(&mut self, sink: &mut dyn MessageSink) {
        let events = self.controller.tick();
        forward_playback_events(self.id, &events, &self.cues, sink);
    }

    fn render(&mut self, surface: &mut Surface, ctx: &RenderContext<'_>) {
        if !self.props.video || !self.visual.is_visible() {
            return;
        }
        self.controller.take_frame_modified();
        let Some(frame) = self.controller.display_frame(ctx) else {
            return;
        };
        surface.blit(frame, placement(&self.props, &self.visual, frame));
    }

    fn attribute(&self, name: &str) -> Result<AttrValue, VideoError> {
        let p = &self.props;
        Ok(match name.to_ascii_lowercase().as_str() {
            "loop" => AttrValue::Bool(self.controller.looping()),
            "pausedatstart" => AttrValue::Bool(p.paused_at_start),
            "video" => AttrValue::Bool(p.video),
            "sound" => AttrValue::Bool(p.sound),
            "crop" => AttrValue::Bool(p.crop),
            "center" => AttrValue::Bool(p.center),
            "directtostage" => AttrValue::Bool(p.direct_to_stage),
            "preload" => AttrValue::Bool(p.pre_load),
            "framerate" => AttrValue::Int(p.frame_rate),
            "movierate" => AttrValue::Int(i64::from(self.movie_rate.num)),
            "movietime" => AttrValue::Int(self.controller.current_timestamp()),
            "duration" => AttrValue::Int(self.controller.duration()),
            "timescale" => AttrValue::Int(i64::from(self.controller.clock().native_scale())),
            "volume" => AttrValue::Int(i64::from(self.volume)),
            _ => return Err(VideoError::UnknownAttribute(name.to_string())),
        })
    }

    fn set_attribute(
        &mut self,
        name: &str,
        value: AttrValue,
        _sink: &mut dyn MessageSink,
    ) -> Result<(), VideoError> {
        match name.to_ascii_lowercase().as_str() {
            "loop" => {
                self.props.looping = value.as_bool(name)?;
                self.controller.set_looping(self.props.looping);
            }
            "pausedatstart" => self.props.paused_at_start = value.as_bool(name)?,
            "video" => self.props.video = value.as_bool(name)?,
            "sound" => {
                self.props.sound = value.as_bool(name)?;
                self.apply_volume();
            }
            "crop" => self.props.crop = value.as_bool(name)?,
            "center" => self.props.center = value.as_bool(name)?,
            "directtostage" => self.props.direct_to_stage = value.as_bool(name)?,
            "preload" => self.props.pre_load = value.as_bool(name)?,
            "framerate" => {
                self.props.frame_rate = value.as_int(name)?;
                self.apply_frame_rate();
            }
            "movierate" => {
                let rate = i32::try_from(value.as_int(name)?).map_err(|_| {
                    VideoError::AttributeType {
                        name: name.to_string(),
                        expected: "a 32-bit rate",
                    }
                })?;
                self.set_movie_rate(Rational::new(rate, 1));
            }
            "movietime" => self.controller.seek(value.as_int(name)?),
            "volume" => {
                let volume = value.as_int(name)?.clamp(0, 100);
                self.volume = u8::try_from(volume).unwrap_or(100);
                self.apply_volume();
            }
            "duration" | "timescale" => {
                return Err(VideoError::ReadOnlyAttribute(name.to_string()));
            }
            _ => return Err(VideoError::UnknownAttribute(name.to_string())),
        }
        Ok(())
    }
}
