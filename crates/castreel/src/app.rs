use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, anyhow};
use crossbeam_channel::{Receiver, Sender};

use castreel::element::def::{ScheduledCommand, SceneDef};
use castreel::element::movie::MovieDef;
use castreel::element::{Command, ElementDef, ElementMessage, MediaElement};
use castreel::media::types::{AssetRef, PixelFormat};
use castreel::playback::controller::FramePolicy;
use castreel::render::{Palette, RenderContext, Surface};
use castreel::settings::PlayerConfig;

/// Command-line switches.
#[derive(Debug, Clone, Default)]
pub struct PlayerArgs {
    pub input: PathBuf,
    pub looping: bool,
    pub every_frame: bool,
    pub ticks: Option<u64>,
    pub paletted: bool,
}

impl PlayerArgs {
    pub fn parse(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let mut parsed = PlayerArgs::default();
        let mut input = None;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--loop" => parsed.looping = true,
                "--every-frame" => parsed.every_frame = true,
                "--paletted" => parsed.paletted = true,
                "--ticks" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow!("--ticks needs a value"))?;
                    parsed.ticks = Some(value.parse()?);
                }
                flag if flag.starts_with("--") => anyhow::bail!("Unknown option '{flag}'"),
                path => input = Some(PathBuf::from(path)),
            }
        }
        parsed.input = input.ok_or_else(|| {
            anyhow!("usage: castreel <media-or-scene.json> [--loop] [--every-frame] [--ticks N] [--paletted]")
        })?;
        Ok(parsed)
    }
}

/// Scene document for `args.input`: parsed JSON, or a single movie that plays at tick 0.
pub fn load_scene(args: &PlayerArgs, config: &PlayerConfig) -> Result<SceneDef> {
    let path = &args.input;
    if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
        let json = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read scene {}: {e}", path.display()))?;
        return SceneDef::from_json(&json)
            .map_err(|e| anyhow!("Invalid scene {}: {e}", path.display()));
    }

    let mut movie = MovieDef::new(1, AssetRef::movie(path.as_path()));
    movie.looping = args.looping;
    movie.alternate = args.every_frame || config.frame_policy() == FramePolicy::EveryFrame;
    movie.volume = config.default_volume.min(100);
    Ok(SceneDef {
        elements: vec![ElementDef::Movie(movie)],
        commands: vec![ScheduledCommand {
            tick: 0,
            element: 1,
            command: Command::Play,
        }],
    })
}

/// Runs a scene without a window: ticks, renders into an offscreen stage and
/// logs every element message.
pub struct HeadlessPlayer {
    scene: SceneDef,
    elements: Vec<Box<dyn MediaElement>>,
    stage: Surface,
    palette: Palette,
    tick_interval: Duration,
    tick: u64,
    message_tx: Sender<ElementMessage>,
    message_rx: Receiver<ElementMessage>,
}

impl HeadlessPlayer {
    pub fn new(config: &PlayerConfig, scene: SceneDef, paletted: bool) -> Self {
        let scale = config.external_time_scale.max(1);
        let options = config.open_options();

        let mut elements = Vec::new();
        for def in &scene.elements {
            let Some(mut element) = def.build(scale) else {
                continue;
            };
            if let Some(asset) = def.asset() {
                element.activate(asset, &options);
            }
            elements.push(element);
        }

        let format = if paletted || config.paletted_stage {
            PixelFormat::Indexed8
        } else {
            PixelFormat::Rgba8
        };
        let (message_tx, message_rx) = crossbeam_channel::unbounded();

        log::info!(
            "Stage {}x{} {:?}, {} element(s), {} ticks/s",
            config.stage_width,
            config.stage_height,
            format,
            elements.len(),
            scale
        );

        Self {
            scene,
            elements,
            stage: Surface::new(config.stage_width, config.stage_height, format),
            palette: Palette::system(),
            tick_interval: Duration::from_secs(1) / scale,
            tick: 0,
            message_tx,
            message_rx,
        }
    }

    pub fn stage(&self) -> &Surface {
        &self.stage
    }

    /// Run one application frame and return the messages it produced.
    pub fn step(&mut self) -> Vec<ElementMessage> {
        let due: Vec<ScheduledCommand> = self.scene.commands_at(self.tick).copied().collect();
        for scheduled in due {
            match self
                .elements
                .iter_mut()
                .find(|e| e.id() == scheduled.element)
            {
                Some(element) => element.handle_command(scheduled.command, &mut self.message_tx),
                None => log::warn!(
                    "Tick {}: no element {} for {:?}",
                    self.tick,
                    scheduled.element,
                    scheduled.command
                ),
            }
        }

        for element in &mut self.elements {
            element.tick(&mut self.message_tx);
        }

        self.stage.clear();
        let ctx = RenderContext::new(self.stage.format, &self.palette);
        for element in &mut self.elements {
            element.render(&mut self.stage, &ctx);
        }

        self.tick += 1;
        self.message_rx.try_iter().collect()
    }

    fn has_pending_commands(&self) -> bool {
        self.scene.commands.iter().any(|c| c.tick >= self.tick)
    }

    fn is_idle(&self) -> bool {
        !self.has_pending_commands() && self.elements.iter().all(|e| !e.is_playing())
    }

    /// Tick in real time until `max_ticks` or until nothing is left to play.
    pub fn run(&mut self, max_ticks: Option<u64>) {
        loop {
            if max_ticks.is_some_and(|max| self.tick >= max) {
                break;
            }
            for message in self.step() {
                log::info!(
                    "tick {:>5}  element {:>3}  {:?}",
                    self.tick,
                    message.element,
                    message.event
                );
            }
            if max_ticks.is_none() && self.is_idle() {
                break;
            }
            std::thread::sleep(self.tick_interval);
        }
        log::info!("Stopped after {} ticks", self.tick);
    }
}

/// Config from the standard location, written back with defaults if absent.
pub fn load_config() -> PlayerConfig {
    let config = PlayerConfig::load();
    if PlayerConfig::path().is_some_and(|p| !Path::exists(&p)) {
        config.save();
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<PlayerArgs> {
        PlayerArgs::parse(list.iter().map(|s| (*s).to_string()))
    }

    #[test]
    fn args_parse_flags() {
        let parsed = args(&["clip.gif", "--loop", "--ticks", "90", "--paletted"]).unwrap();
        assert_eq!(parsed.input, PathBuf::from("clip.gif"));
        assert!(parsed.looping);
        assert!(parsed.paletted);
        assert!(!parsed.every_frame);
        assert_eq!(parsed.ticks, Some(90));
    }

    #[test]
    fn args_reject_bad_input() {
        assert!(args(&[]).is_err());
        assert!(args(&["clip.gif", "--fast"]).is_err());
        assert!(args(&["clip.gif", "--ticks"]).is_err());
        assert!(args(&["clip.gif", "--ticks", "many"]).is_err());
    }

    #[test]
    fn single_media_becomes_movie_scene() {
        let parsed = args(&["clip.gif", "--every-frame"]).unwrap();
        let scene = load_scene(&parsed, &PlayerConfig::default()).unwrap();
        assert!(matches!(&scene.elements[0], ElementDef::Movie(def) if def.alternate));
        assert_eq!(scene.commands[0].command, Command::Play);
    }

    #[test]
    fn headless_player_without_video_runs_to_idle() {
        let dir = tempfile::tempdir().unwrap();
        let parsed = args(&[dir.path().join("missing.gif").to_str().unwrap()]).unwrap();
        let config = PlayerConfig {
            stage_width: 4,
            stage_height: 4,
            ..PlayerConfig::default()
        };
        let scene = load_scene(&parsed, &config).unwrap();
        let mut player = HeadlessPlayer::new(&config, scene, true);
        let messages = player.step();
        assert_eq!(messages.len(), 1);
        assert_eq!(player.stage().format, PixelFormat::Indexed8);
        assert!(player.stage().pixels().iter().all(|&b| b == 0));
    }
}
