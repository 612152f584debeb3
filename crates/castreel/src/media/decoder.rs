use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::source::{MediaClock, SystemClock, VideoSource};
use super::types::{ContainerKind, Frame, Rational};
use crate::error::VideoError;

/// Native time scale of every container decoded here (milliseconds).
pub const NATIVE_TIME_SCALE: u32 = 1000;

/// GIF delays shorter than this are treated as this (browsers do the same).
const MIN_GIF_DELAY_MS: i64 = 20;

/// Load-time options for the built-in containers.
#[derive(Debug, Clone, Copy)]
pub struct OpenOptions {
    /// Frame rate for image-sequence containers.
    pub sequence_fps: u32,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self { sequence_fps: 15 }
    }
}

/// Trial-load `path`: animated GIF first, then image sequence.
pub fn open_video(path: &Path, options: &OpenOptions) -> Result<Box<dyn VideoSource>, VideoError> {
    open_video_with_clock(path, options, SystemClock::new())
}

/// Same as [`open_video`] with an explicit playback clock.
pub fn open_video_with_clock<C: MediaClock + 'static>(
    path: &Path,
    options: &OpenOptions,
    clock: C,
) -> Result<Box<dyn VideoSource>, VideoError> {
    let source = FrameSequenceSource::open(path, options, clock)?;
    Ok(Box::new(source))
}

/// Frames pre-decoded at load time, paired with their start times.
struct DecodedClip {
    container: ContainerKind,
    frames: Vec<Frame>,
    starts_ms: Vec<i64>,
    duration_ms: i64,
}

/// A fully pre-decoded clip played back against a [`MediaClock`].
pub struct FrameSequenceSource<C: MediaClock = SystemClock> {
    container: ContainerKind,
    frames: Vec<Frame>,
    starts_ms: Vec<i64>,
    duration: i64,
    clock: C,
    playing: bool,
    paused: bool,
    rate: Rational,
    /// Position at the last re-anchor.
    base_time: i64,
    /// Clock reading at the last re-anchor.
    anchor_ms: u64,
    end_time: i64,
    next_frame: usize,
    last_frame: Option<usize>,
    volume: u8,
}

impl<C: MediaClock> FrameSequenceSource<C> {
    pub fn open(path: &Path, options: &OpenOptions, clock: C) -> Result<Self, VideoError> {
        if !path.exists() {
            return Err(VideoError::NotFound(path.to_path_buf()));
        }

        let clip = match load_gif(path) {
            Ok(clip) => clip,
            Err(gif_err) => {
                log::debug!("{} is not a GIF ({gif_err}), trying image sequence", path.display());
                match load_image_sequence(path, options.sequence_fps) {
                    Ok(clip) => clip,
                    Err(seq_err) => {
                        log::debug!("{} is not an image sequence: {seq_err}", path.display());
                        return Err(VideoError::UnsupportedContainer(path.to_path_buf()));
                    }
                }
            }
        };

        let (w, h) = clip.frames.first().map_or((0, 0), |f| (f.width, f.height));
        log::info!(
            "Loaded {}: {}x{}, {} frame{}, {}ms",
            clip.container.display_name(),
            w,
            h,
            clip.frames.len(),
            if clip.frames.len() == 1 { "" } else { "s" },
            clip.duration_ms
        );

        Ok(Self::from_frames(clip, clock))
    }

    fn from_frames(clip: DecodedClip, clock: C) -> Self {
        let anchor_ms = clock.now_ms();
        Self {
            container: clip.container,
            frames: clip.frames,
            starts_ms: clip.starts_ms,
            duration: clip.duration_ms,
            clock,
            playing: false,
            paused: false,
            rate: Rational::ONE,
            base_time: 0,
            anchor_ms,
            end_time: clip.duration_ms,
            next_frame: 0,
            last_frame: None,
            volume: 255,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    fn advancing(&self) -> bool {
        self.playing && !self.paused && !self.rate.is_zero()
    }

    fn effective_end(&self) -> i64 {
        self.end_time.min(self.duration)
    }

    /// Index of the frame visible at `time`.
    fn frame_at(&self, time: i64) -> usize {
        self.starts_ms
            .partition_point(|&s| s <= time)
            .saturating_sub(1)
    }

    /// Fold elapsed clock time into `base_time`.
    fn reanchor(&mut self) {
        self.base_time = self.time();
        self.anchor_ms = self.clock.now_ms();
    }
}

impl<C: MediaClock> VideoSource for FrameSequenceSource<C> {
    fn container(&self) -> ContainerKind {
        self.container
    }

    fn time_scale(&self) -> u32 {
        NATIVE_TIME_SCALE
    }

    fn duration(&self) -> i64 {
        self.duration
    }

    fn time(&self) -> i64 {
        if !self.advancing() {
            return self.base_time;
        }
        let elapsed = self.clock.now_ms().saturating_sub(self.anchor_ms) as i64;
        let t = self.base_time + self.rate.scale(elapsed);
        t.clamp(0, self.effective_end().max(self.base_time))
    }

    fn current_frame_index(&self) -> Option<usize> {
        self.last_frame
    }

    fn frame_size(&self) -> (u32, u32) {
        self.frames.first().map_or((0, 0), |f| (f.width, f.height))
    }

    fn decode_next_frame(&mut self) -> Result<Option<Frame>, VideoError> {
        if self.next_frame >= self.frames.len() {
            return Ok(None);
        }
        // The first decode after a seek always yields the frame at the seek point
        if self.last_frame.is_some() && !self.needs_update() {
            return Ok(None);
        }

        let index = self.next_frame;
        self.next_frame += 1;
        self.last_frame = Some(index);

        let frame = &self.frames[index];
        if !frame.is_well_formed() {
            return Err(VideoError::CorruptFrame {
                index,
                reason: format!(
                    "expected {} bytes, found {}",
                    frame.expected_len(),
                    frame.data.len()
                ),
            });
        }
        Ok(Some(frame.clone()))
    }

    fn needs_update(&self) -> bool {
        let Some(&start) = self.starts_ms.get(self.next_frame) else {
            return false;
        };
        if self.last_frame.is_none() {
            return true;
        }
        start <= self.time() && (start < self.effective_end() || start == 0)
    }

    fn end_of_video(&self) -> bool {
        self.time() >= self.effective_end()
    }

    fn seek(&mut self, time: i64) -> Result<(), VideoError> {
        if time < 0 || time > self.duration {
            return Err(VideoError::Seek {
                target: time,
                duration: self.duration,
            });
        }
        self.base_time = time;
        self.anchor_ms = self.clock.now_ms();
        self.next_frame = self.frame_at(time);
        self.last_frame = None;
        Ok(())
    }

    fn set_rate(&mut self, rate: Rational) {
        self.reanchor();
        if rate.is_negative() {
            log::warn!("STUB: reverse playback is not supported, playing forward at {}", rate.abs());
            self.rate = rate.abs();
        } else {
            self.rate = rate;
        }
    }

    fn rate(&self) -> Rational {
        self.rate
    }

    fn set_end_time(&mut self, time: i64) {
        self.reanchor();
        self.end_time = time.clamp(0, self.duration);
    }

    fn start(&mut self) {
        if !self.playing {
            self.anchor_ms = self.clock.now_ms();
            self.playing = true;
        }
    }

    fn stop(&mut self) {
        if self.playing {
            self.reanchor();
            self.playing = false;
        }
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn pause(&mut self, paused: bool) {
        if paused == self.paused {
            return;
        }
        self.reanchor();
        self.paused = paused;
    }

    fn set_volume(&mut self, volume: u8) {
        self.volume = volume;
    }
}

fn has_gif_signature(path: &Path) -> Result<bool, VideoError> {
    let mut magic = [0u8; 6];
    let mut file = File::open(path)?;
    if file.read_exact(&mut magic).is_err() {
        return Ok(false);
    }
    Ok(&magic == b"GIF87a" || &magic == b"GIF89a")
}

/// Decode every frame of an animated GIF, compositing partial frames.
fn load_gif(path: &Path) -> Result<DecodedClip, VideoError> {
    if !path.is_file() || !has_gif_signature(path)? {
        return Err(VideoError::UnsupportedContainer(path.to_path_buf()));
    }

    let file = File::open(path)?;
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::RGBA);
    let mut reader = options.read_info(file)?;

    let width = u32::from(reader.width());
    let height = u32::from(reader.height());

    let mut frames = Vec::new();
    let mut starts_ms = Vec::new();
    let mut elapsed: i64 = 0;

    // GIF frames can be partial updates
    let mut canvas = vec![0u8; (width * height * 4) as usize];

    while let Some(frame) = reader.read_next_frame()? {
        // Delay is in centiseconds
        let delay = (i64::from(frame.delay) * 10).max(MIN_GIF_DELAY_MS);

        let fx = u32::from(frame.left);
        let fy = u32::from(frame.top);
        let fw = u32::from(frame.width);
        let fh = u32::from(frame.height);

        for y in 0..fh {
            for x in 0..fw {
                let src_idx = ((y * fw + x) * 4) as usize;
                let dst_x = fx + x;
                let dst_y = fy + y;
                if dst_x < width && dst_y < height {
                    let dst_idx = ((dst_y * width + dst_x) * 4) as usize;
                    let Some(src) = frame.buffer.get(src_idx..src_idx + 4) else {
                        continue;
                    };
                    // Transparent pixels keep what's underneath
                    if src[3] > 0 {
                        canvas[dst_idx..dst_idx + 4].copy_from_slice(src);
                    }
                }
            }
        }

        starts_ms.push(elapsed);
        frames.push(Frame::rgba(width, height, canvas.clone()));
        elapsed += delay;
    }

    if frames.is_empty() {
        return Err(VideoError::Decode {
            path: path.to_path_buf(),
            reason: "GIF has no frames".to_string(),
        });
    }

    Ok(DecodedClip {
        container: ContainerKind::AnimatedGif,
        frames,
        starts_ms,
        duration_ms: elapsed,
    })
}

/// A still image, or a directory of still images ordered by file name.
fn load_image_sequence(path: &Path, fps: u32) -> Result<DecodedClip, VideoError> {
    let fps = i64::from(fps.max(1));
    let paths = if path.is_dir() {
        sequence_entries(path)?
    } else {
        vec![path.to_path_buf()]
    };

    if paths.is_empty() {
        return Err(VideoError::Decode {
            path: path.to_path_buf(),
            reason: "no images in sequence directory".to_string(),
        });
    }

    let mut frames: Vec<Frame> = Vec::with_capacity(paths.len());
    for p in &paths {
        let rgba = image::open(p)?.to_rgba8();
        let (w, h) = rgba.dimensions();
        if let Some(first) = frames.first() {
            if (first.width, first.height) != (w, h) {
                return Err(VideoError::Decode {
                    path: p.clone(),
                    reason: format!(
                        "frame is {w}x{h}, sequence is {}x{}",
                        first.width, first.height
                    ),
                });
            }
        }
        frames.push(Frame::rgba(w, h, rgba.into_raw()));
    }

    // Cumulative integer starts so long sequences don't drift
    let starts_ms: Vec<i64> = (0..frames.len() as i64).map(|i| i * 1000 / fps).collect();
    let duration_ms = frames.len() as i64 * 1000 / fps;

    Ok(DecodedClip {
        container: ContainerKind::ImageSequence,
        frames,
        starts_ms,
        duration_ms,
    })
}

fn sequence_entries(dir: &Path) -> Result<Vec<PathBuf>, VideoError> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file() && image::ImageFormat::from_path(p).is_ok())
        .collect();
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;
    use crate::media::source::ManualClock;

    /// Three 2x2 frames: black, red, black, 50ms each.
    fn write_gif(path: &Path) {
        let mut file = File::create(path).unwrap();
        let mut encoder = gif::Encoder::new(&mut file, 2, 2, &[0, 0, 0, 255, 0, 0]).unwrap();
        for color in [0u8, 1, 0] {
            let mut frame = gif::Frame::default();
            frame.width = 2;
            frame.height = 2;
            frame.delay = 5;
            frame.buffer = Cow::Owned(vec![color; 4]);
            encoder.write_frame(&frame).unwrap();
        }
    }

    fn write_png(path: &Path, w: u32, h: u32, rgba: [u8; 4]) {
        image::RgbaImage::from_pixel(w, h, image::Rgba(rgba))
            .save(path)
            .unwrap();
    }

    #[test]
    fn decoder_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_video(&dir.path().join("nope.gif"), &OpenOptions::default()).err();
        assert!(matches!(err, Some(VideoError::NotFound(_))));
    }

    #[test]
    fn decoder_unknown_container() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movie.moov");
        std::fs::write(&path, b"not a movie at all").unwrap();
        let err = open_video(&path, &OpenOptions::default()).err();
        assert!(matches!(err, Some(VideoError::UnsupportedContainer(_))));
    }

    #[test]
    fn decoder_loads_gif_with_delays() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anim.gif");
        write_gif(&path);

        let clock = ManualClock::new();
        let src = FrameSequenceSource::open(&path, &OpenOptions::default(), clock).unwrap();
        assert_eq!(src.container(), ContainerKind::AnimatedGif);
        assert_eq!(src.frame_count(), 3);
        assert_eq!(src.duration(), 150);
        assert_eq!(src.time_scale(), 1000);
        assert_eq!(src.frame_size(), (2, 2));
    }

    #[test]
    fn decoder_gif_plays_against_clock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anim.gif");
        write_gif(&path);

        let clock = ManualClock::new();
        let mut src =
            FrameSequenceSource::open(&path, &OpenOptions::default(), clock.clone()).unwrap();

        let first = src.decode_next_frame().unwrap().unwrap();
        assert_eq!(&first.data[..4], &[0, 0, 0, 255]);
        assert!(!src.needs_update());

        src.start();
        clock.advance(60);
        assert_eq!(src.time(), 60);
        assert!(src.needs_update());
        let second = src.decode_next_frame().unwrap().unwrap();
        assert_eq!(&second.data[..4], &[255, 0, 0, 255]);
        assert_eq!(src.current_frame_index(), Some(1));
        assert!(!src.needs_update());
        assert!(src.decode_next_frame().unwrap().is_none());

        clock.advance(500);
        assert_eq!(src.time(), 150);
        assert!(src.end_of_video());
    }

    #[test]
    fn decoder_pause_freezes_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anim.gif");
        write_gif(&path);

        let clock = ManualClock::new();
        let mut src =
            FrameSequenceSource::open(&path, &OpenOptions::default(), clock.clone()).unwrap();
        src.start();
        clock.advance(30);
        src.pause(true);
        clock.advance(100);
        assert_eq!(src.time(), 30);
        src.pause(false);
        clock.advance(10);
        assert_eq!(src.time(), 40);
    }

    #[test]
    fn decoder_seek_and_end_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anim.gif");
        write_gif(&path);

        let clock = ManualClock::new();
        let mut src =
            FrameSequenceSource::open(&path, &OpenOptions::default(), clock.clone()).unwrap();
        src.seek(75).unwrap();
        src.set_end_time(100);
        let frame = src.decode_next_frame().unwrap().unwrap();
        assert_eq!(&frame.data[..4], &[255, 0, 0, 255]);

        src.start();
        clock.advance(1000);
        assert_eq!(src.time(), 100);
        assert!(src.end_of_video());
        // Frame 2 starts exactly at the end time and must not be produced
        assert!(!src.needs_update());

        assert!(matches!(src.seek(151), Err(VideoError::Seek { .. })));
        assert!(matches!(src.seek(-1), Err(VideoError::Seek { .. })));
    }

    #[test]
    fn decoder_reverse_rate_is_stubbed_forward() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anim.gif");
        write_gif(&path);

        let clock = ManualClock::new();
        let mut src =
            FrameSequenceSource::open(&path, &OpenOptions::default(), clock.clone()).unwrap();
        src.set_rate(Rational::new(-1, 1));
        assert_eq!(src.rate(), Rational::ONE);
        src.start();
        clock.advance(20);
        assert_eq!(src.time(), 20);
    }

    #[test]
    fn decoder_loads_png_directory_as_sequence() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("frame_002.png"), 4, 3, [0, 255, 0, 255]);
        write_png(&dir.path().join("frame_001.png"), 4, 3, [0, 0, 255, 255]);
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let options = OpenOptions { sequence_fps: 10 };
        let mut src = FrameSequenceSource::open(dir.path(), &options, ManualClock::new()).unwrap();
        assert_eq!(src.container(), ContainerKind::ImageSequence);
        assert_eq!(src.frame_count(), 2);
        assert_eq!(src.duration(), 200);

        // Sorted by name: blue first
        let first = src.decode_next_frame().unwrap().unwrap();
        assert_eq!(&first.data[..4], &[0, 0, 255, 255]);
    }

    #[test]
    fn decoder_sequence_rejects_mismatched_sizes() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("a.png"), 4, 3, [0, 0, 0, 255]);
        write_png(&dir.path().join("b.png"), 2, 2, [0, 0, 0, 255]);
        let err = open_video(dir.path(), &OpenOptions::default()).err();
        assert!(matches!(err, Some(VideoError::UnsupportedContainer(_))));
    }

    #[test]
    fn decoder_still_image_is_single_frame_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("still.png");
        write_png(&path, 1, 1, [9, 9, 9, 255]);
        let src = open_video(&path, &OpenOptions::default()).unwrap();
        assert_eq!(src.container(), ContainerKind::ImageSequence);
        assert_eq!(src.duration(), 66);
    }
}
