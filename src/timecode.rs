//! Frame and timecode arithmetic for a fixed, integer frame rate.
//!
//! Two representations are produced here:
//! - EDL timecode `HH:MM:SS:FF`, non-drop, quantized to frames
//! - display timecode `HH:MM:SS.mmm`, quantized to milliseconds
//!
//! Both round half-up and clamp negative seconds to zero.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CutError, Result};

/// Integer frames per second. Zero is rejected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct FrameRate(u32);

impl FrameRate {
    pub const FPS_30: FrameRate = FrameRate(30);

    pub fn new(fps: u32) -> Result<Self> {
        if fps == 0 {
            return Err(CutError::validation("frame rate must be greater than zero"));
        }
        Ok(Self(fps))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::FPS_30
    }
}

impl TryFrom<u32> for FrameRate {
    type Error = CutError;

    fn try_from(value: u32) -> Result<Self> {
        FrameRate::new(value)
    }
}

impl From<FrameRate> for u32 {
    fn from(value: FrameRate) -> Self {
        value.0
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}fps", self.0)
    }
}

pub fn clamp(x: f64, lo: f64, hi: f64) -> f64 {
    lo.max(hi.min(x))
}

fn non_negative(seconds: f64) -> f64 {
    if seconds.is_finite() {
        seconds.max(0.0)
    } else {
        0.0
    }
}

/// Nearest frame index for a position in seconds.
pub fn seconds_to_frames(seconds: f64, fps: FrameRate) -> u64 {
    // f64::round is half away from zero, i.e. half-up once negatives are clamped.
    (non_negative(seconds) * fps.get() as f64).round() as u64
}

/// Non-drop-frame `HH:MM:SS:FF`. Hours are not wrapped at 24.
pub fn frames_to_timecode(frames: u64, fps: FrameRate) -> String {
    let fps = u64::from(fps.get());
    let ff = frames % fps;
    let total_seconds = frames / fps;
    let ss = total_seconds % 60;
    let total_minutes = total_seconds / 60;
    let mm = total_minutes % 60;
    let hh = total_minutes / 60;
    format!("{hh:02}:{mm:02}:{ss:02}:{ff:02}")
}

pub fn seconds_to_timecode(seconds: f64, fps: FrameRate) -> String {
    frames_to_timecode(seconds_to_frames(seconds, fps), fps)
}

/// Human-readable `HH:MM:SS.mmm` for operator feedback.
pub fn format_display_timecode(seconds: f64) -> String {
    // Decompose the rounded millisecond total so the ms field can never read 1000.
    let total_ms = (non_negative(seconds) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_seconds = total_ms / 1000;
    let s = total_seconds % 60;
    let m = (total_seconds / 60) % 60;
    let h = total_seconds / 3600;
    format!("{h:02}:{m:02}:{s:02}.{ms:03}")
}
