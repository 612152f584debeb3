//! Test doubles shared by unit tests.

use std::borrow::Cow;
use std::cell::RefCell;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::error::VideoError;
use crate::media::source::VideoSource;
use crate::media::types::{ContainerKind, Frame, Rational, Rgba};

/// Knobs and call log for a [`ScriptedSource`].
#[derive(Debug)]
pub struct ScriptState {
    pub duration: i64,
    pub time_scale: u32,
    /// Position reported by `time()`. Tests move it by hand.
    pub time: i64,
    pub end_of_video: bool,
    pub end_time: i64,
    /// Frames `needs_update` will report as due.
    pub frames_due: usize,
    pub fail_next_decode: bool,
    /// Next decode fails with an error that drops the source.
    pub fail_decode_fatally: bool,
    pub fail_seek: bool,
    pub seeks: Vec<i64>,
    pub decodes: usize,
    pub playing: bool,
    pub paused: bool,
    pub volume: u8,
    pub rate: Rational,
    frame_after_seek: bool,
}

pub type SourceScript = Rc<RefCell<ScriptState>>;

/// Video source whose clock and decode results are driven by the test.
pub struct ScriptedSource {
    state: SourceScript,
}

impl ScriptedSource {
    pub fn new(duration: i64, time_scale: u32) -> (Self, SourceScript) {
        let state = Rc::new(RefCell::new(ScriptState {
            duration,
            time_scale,
            time: 0,
            end_of_video: false,
            end_time: duration,
            frames_due: 0,
            fail_next_decode: false,
            fail_decode_fatally: false,
            fail_seek: false,
            seeks: Vec::new(),
            decodes: 0,
            playing: false,
            paused: false,
            volume: 255,
            rate: Rational::ONE,
            frame_after_seek: false,
        }));
        (
            Self {
                state: Rc::clone(&state),
            },
            state,
        )
    }
}

impl VideoSource for ScriptedSource {
    fn container(&self) -> ContainerKind {
        ContainerKind::ImageSequence
    }

    fn time_scale(&self) -> u32 {
        self.state.borrow().time_scale
    }

    fn duration(&self) -> i64 {
        self.state.borrow().duration
    }

    fn time(&self) -> i64 {
        self.state.borrow().time
    }

    fn current_frame_index(&self) -> Option<usize> {
        self.state.borrow().decodes.checked_sub(1)
    }

    fn frame_size(&self) -> (u32, u32) {
        (2, 2)
    }

    fn decode_next_frame(&mut self) -> Result<Option<Frame>, VideoError> {
        let mut s = self.state.borrow_mut();
        if s.fail_decode_fatally {
            s.fail_decode_fatally = false;
            return Err(VideoError::Decode {
                path: PathBuf::from("scripted.mov"),
                reason: "scripted stream failure".into(),
            });
        }
        if s.fail_next_decode {
            s.fail_next_decode = false;
            return Err(VideoError::CorruptFrame {
                index: s.decodes,
                reason: "scripted failure".into(),
            });
        }
        if s.frame_after_seek {
            s.frame_after_seek = false;
        } else if s.frames_due > 0 {
            s.frames_due -= 1;
        } else {
            return Ok(None);
        }
        s.decodes += 1;
        let shade = u8::try_from(s.decodes % 256).unwrap_or(0);
        Ok(Some(Frame::filled(
            2,
            2,
            Rgba {
                r: shade,
                g: 0,
                b: 0,
                a: 255,
            },
        )))
    }

    fn needs_update(&self) -> bool {
        self.state.borrow().frames_due > 0
    }

    fn end_of_video(&self) -> bool {
        self.state.borrow().end_of_video
    }

    fn seek(&mut self, time: i64) -> Result<(), VideoError> {
        let mut s = self.state.borrow_mut();
        if s.fail_seek {
            return Err(VideoError::Seek {
                target: time,
                duration: s.duration,
            });
        }
        s.seeks.push(time);
        s.time = time;
        s.frame_after_seek = true;
        Ok(())
    }

    fn set_rate(&mut self, rate: Rational) {
        self.state.borrow_mut().rate = rate;
    }

    fn rate(&self) -> Rational {
        self.state.borrow().rate
    }

    fn set_end_time(&mut self, time: i64) {
        self.state.borrow_mut().end_time = time;
    }

    fn start(&mut self) {
        self.state.borrow_mut().playing = true;
    }

    fn stop(&mut self) {
        self.state.borrow_mut().playing = false;
    }

    fn is_playing(&self) -> bool {
        self.state.borrow().playing
    }

    fn is_paused(&self) -> bool {
        self.state.borrow().paused
    }

    fn pause(&mut self, paused: bool) {
        self.state.borrow_mut().paused = paused;
    }

    fn set_volume(&mut self, volume: u8) {
        self.state.borrow_mut().volume = volume;
    }
}

/// Writes a 2x2 animated GIF of `frames` frames alternating black and white,
/// each shown for `delay_cs` centiseconds.
pub fn write_gif(path: &Path, frames: usize, delay_cs: u16) {
    let mut file = File::create(path).unwrap();
    let mut encoder = gif::Encoder::new(&mut file, 2, 2, &[0, 0, 0, 255, 255, 255]).unwrap();
    for i in 0..frames {
        let mut frame = gif::Frame::default();
        frame.width = 2;
        frame.height = 2;
        frame.delay = delay_cs;
        frame.buffer = Cow::Owned(vec![u8::from(i % 2 == 1); 4]);
        encoder.write_frame(&frame).unwrap();
    }
}
