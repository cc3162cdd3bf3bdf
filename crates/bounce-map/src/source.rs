//! Frame sources.
//!
//! Analysis consumes decoded frames through [`FrameSource`]. The bundled
//! [`ImageSequenceSource`] reads a directory of still frames (as produced by
//! `ffmpeg -i clip.mp4 frames/%06d.png`) at a declared frame rate.

use std::{
    collections::VecDeque,
    fs,
    path::{Path, PathBuf},
};

use image::{ImageReader, RgbImage};
use serde::{Deserialize, Serialize};

use crate::track::effective_frame_rate;

const FRAME_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "tif"];

/// Errors opening or decoding a frame source.
#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("cannot open video source {path}: {reason}")]
    Open { path: String, reason: String },
    #[error("failed to decode frame {index} ({path}): {source}")]
    Decode {
        index: u64,
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("frame {index} is {got_w}x{got_h}, expected {want_w}x{want_h}")]
    SizeMismatch {
        index: u64,
        got_w: u32,
        got_h: u32,
        want_w: u32,
        want_h: u32,
    },
}

/// Stream properties known once the source is open.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub frame_rate: f64,
    pub frame_count: Option<u64>,
    pub width: u32,
    pub height: u32,
}

/// One decoded frame.
#[derive(Clone, Debug)]
pub struct Frame {
    pub index: u64,
    pub image: RgbImage,
}

/// Sequential, non-rewindable frame stream.
pub trait FrameSource {
    fn info(&self) -> VideoInfo;

    /// Next frame, or `None` at end of stream. A decode error ends the run.
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError>;
}

/// Directory of still frames, read in file-name order.
pub struct ImageSequenceSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    next: usize,
    info: VideoInfo,
}

impl ImageSequenceSource {
    /// Open `dir` and decode its first frame to learn the frame size.
    ///
    /// A non-positive or non-finite `frame_rate` falls back to 30 fps.
    pub fn open(dir: impl AsRef<Path>, frame_rate: f64) -> Result<Self, SourceError> {
        let dir = dir.as_ref().to_path_buf();
        let open_err = |reason: String| SourceError::Open {
            path: dir.display().to_string(),
            reason,
        };

        let entries = fs::read_dir(&dir).map_err(|e| open_err(e.to_string()))?;
        let mut files: Vec<PathBuf> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_frame_file(p))
            .collect();
        files.sort();

        let first = files
            .first()
            .ok_or_else(|| open_err("no frame images found".to_string()))?;
        let probe = ImageReader::open(first)
            .map_err(|e| open_err(e.to_string()))?
            .into_dimensions()
            .map_err(|e| open_err(e.to_string()))?;

        let info = VideoInfo {
            frame_rate: effective_frame_rate(frame_rate),
            frame_count: Some(files.len() as u64),
            width: probe.0,
            height: probe.1,
        };
        log::info!(
            "opened {} frame(s) {}x{} @ {:.3} fps from {}",
            files.len(),
            info.width,
            info.height,
            info.frame_rate,
            dir.display()
        );

        Ok(Self {
            dir,
            files,
            next: 0,
            info,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| FRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSource for ImageSequenceSource {
    fn info(&self) -> VideoInfo {
        self.info
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        let Some(path) = self.files.get(self.next) else {
            return Ok(None);
        };
        let index = self.next as u64;
        let decode_err = |source| SourceError::Decode {
            index,
            path: path.display().to_string(),
            source,
        };
        let image = ImageReader::open(path)
            .map_err(|e| decode_err(image::ImageError::IoError(e)))?
            .decode()
            .map_err(decode_err)?
            .to_rgb8();

        if image.dimensions() != (self.info.width, self.info.height) {
            return Err(SourceError::SizeMismatch {
                index,
                got_w: image.width(),
                got_h: image.height(),
                want_w: self.info.width,
                want_h: self.info.height,
            });
        }

        self.next += 1;
        Ok(Some(Frame { index, image }))
    }
}

/// Frames held in memory, mostly for embedding and tests.
pub struct InMemorySource {
    info: VideoInfo,
    frames: VecDeque<RgbImage>,
    next: u64,
}

impl InMemorySource {
    /// Frames must share one size; the first frame defines it.
    pub fn new(frames: Vec<RgbImage>, frame_rate: f64) -> Self {
        let (width, height) = frames.first().map(|f| f.dimensions()).unwrap_or((0, 0));
        Self {
            info: VideoInfo {
                frame_rate: effective_frame_rate(frame_rate),
                frame_count: Some(frames.len() as u64),
                width,
                height,
            },
            frames: frames.into(),
            next: 0,
        }
    }
}

impl FrameSource for InMemorySource {
    fn info(&self) -> VideoInfo {
        self.info
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        let Some(image) = self.frames.pop_front() else {
            return Ok(None);
        };
        let index = self.next;
        self.next += 1;
        Ok(Some(Frame { index, image }))
    }
}
