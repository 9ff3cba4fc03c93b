use serde::{Deserialize, Serialize};

use crate::error::{CutError, Result};

/// Tunables for turning detector output into a timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Scene score above which the detector reports a cut. Lower means more cuts.
    pub scene_threshold: f64,

    /// Cuts closer than this to the previously kept cut are merged into it.
    /// Zero disables merging; timestamps are still normalized to milliseconds.
    pub dedupe_window_sec: f64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            scene_threshold: 0.10,
            dedupe_window_sec: 0.05,
        }
    }
}

impl SegmentationConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.scene_threshold.is_finite() || self.scene_threshold < 0.0 {
            return Err(CutError::validation(format!(
                "scene threshold must be non-negative, got {}",
                self.scene_threshold
            )));
        }
        validate_window(self.dedupe_window_sec)
    }
}

pub fn validate_window(window_sec: f64) -> Result<()> {
    if !window_sec.is_finite() || window_sec < 0.0 {
        return Err(CutError::validation(format!(
            "dedupe window must be non-negative, got {window_sec}"
        )));
    }
    Ok(())
}
