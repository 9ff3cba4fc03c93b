//! Seams to the external media tools. The core only decides *what* to ask
//! for; how detection, probing and extraction happen lives behind these traits.

pub mod ffmpeg;
pub mod playback;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::VideoInfo;
use crate::timecode::FrameRate;

pub use ffmpeg::FfmpegTools;
pub use playback::{PlaybackClock, PlaybackState, WallClockPlayback};

pub trait SceneDetector: Send + Sync {
    /// Raw cut timestamps in seconds. Order and duplicates are unconstrained.
    fn detect_cuts(&self, input: &Path, threshold: f64) -> Result<Vec<f64>>;
}

pub trait Prober: Send + Sync {
    fn probe(&self, input: &Path) -> Result<VideoInfo>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExtractMode {
    /// Stream copy. Fast, but cut points may snap to keyframes.
    FastCopy,
    /// Full re-encode. Frame accurate, slow.
    Reencode,
}

#[derive(Debug, Clone)]
pub struct ClipRequest {
    pub input: PathBuf,
    pub start: f64,
    pub end: f64,
    pub output: PathBuf,
    pub mode: ExtractMode,
}

/// Solid white clip matching the source geometry, used as the EDL base media.
#[derive(Debug, Clone)]
pub struct BlankMaster {
    pub output: PathBuf,
    pub info: VideoInfo,
    pub fps: FrameRate,
}

pub trait Transcoder: Send + Sync {
    fn extract_clip(&self, request: &ClipRequest) -> Result<()>;

    fn render_blank_master(&self, master: &BlankMaster) -> Result<()>;
}
