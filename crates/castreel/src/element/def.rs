use serde::{Deserialize, Serialize};

use super::digital_video::{DigitalVideoCastMember, DigitalVideoDef};
use super::movie::{MovieDef, MovieElement};
use super::{Command, ElementId, MediaElement};
use crate::media::types::AssetRef;

/// Definition of a media kind this player doesn't render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpaqueDef {
    pub id: ElementId,
    #[serde(default)]
    pub name: String,
}

/// One element of a scene document, tagged by media kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ElementDef {
    Movie(MovieDef),
    DigitalVideo(DigitalVideoDef),
    Bitmap(OpaqueDef),
    Shape(OpaqueDef),
    Text(OpaqueDef),
    Sound(OpaqueDef),
    FilmLoop(OpaqueDef),
    Mtoon(OpaqueDef),
}

impl ElementDef {
    pub fn id(&self) -> ElementId {
        match self {
            ElementDef::Movie(def) => def.id,
            ElementDef::DigitalVideo(def) => def.id,
            ElementDef::Bitmap(def)
            | ElementDef::Shape(def)
            | ElementDef::Text(def)
            | ElementDef::Sound(def)
            | ElementDef::FilmLoop(def)
            | ElementDef::Mtoon(def) => def.id,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            ElementDef::Movie(_) => "movie",
            ElementDef::DigitalVideo(_) => "digital_video",
            ElementDef::Bitmap(_) => "bitmap",
            ElementDef::Shape(_) => "shape",
            ElementDef::Text(_) => "text",
            ElementDef::Sound(_) => "sound",
            ElementDef::FilmLoop(_) => "film_loop",
            ElementDef::Mtoon(_) => "mtoon",
        }
    }

    /// Asset the element binds on activation.
    pub fn asset(&self) -> Option<&AssetRef> {
        match self {
            ElementDef::Movie(def) => Some(&def.asset),
            ElementDef::DigitalVideo(def) => Some(&def.asset),
            _ => None,
        }
    }

    /// Construct the runtime element. Kinds without a video adapter yield `None`.
    pub fn build(&self, external_scale: u32) -> Option<Box<dyn MediaElement>> {
        match self {
            ElementDef::Movie(def) => Some(Box::new(MovieElement::new(def, external_scale))),
            ElementDef::DigitalVideo(def) => Some(Box::new(DigitalVideoCastMember::new(
                def,
                external_scale,
            ))),
            other => {
                log::warn!(
                    "Element {}: '{}' elements are not supported, skipping",
                    other.id(),
                    other.kind_name()
                );
                None
            }
        }
    }
}

/// A command issued to an element at a given tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledCommand {
    pub tick: u64,
    pub element: ElementId,
    pub command: Command,
}

/// A scene document: elements plus a command timeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneDef {
    #[serde(default)]
    pub elements: Vec<ElementDef>,
    #[serde(default)]
    pub commands: Vec<ScheduledCommand>,
}

impl SceneDef {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Commands due at `tick`, in document order.
    pub fn commands_at(&self, tick: u64) -> impl Iterator<Item = &ScheduledCommand> {
        self.commands.iter().filter(move |c| c.tick == tick)
    }
}
