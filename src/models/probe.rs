use serde::{Deserialize, Serialize};

use crate::error::{CutError, Result};

/// Stream geometry and container duration reported by the prober.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub duration_secs: f64,
}

impl VideoInfo {
    pub fn new(width: u32, height: u32, duration_secs: f64) -> Result<Self> {
        validate_duration(duration_secs)?;
        if width == 0 || height == 0 {
            return Err(CutError::validation(format!(
                "invalid frame size {width}x{height}"
            )));
        }
        Ok(Self {
            width,
            height,
            duration_secs,
        })
    }
}

pub fn validate_duration(duration_secs: f64) -> Result<()> {
    if !duration_secs.is_finite() || duration_secs <= 0.0 {
        return Err(CutError::validation(format!(
            "duration must be positive, got {duration_secs}"
        )));
    }
    Ok(())
}
