use serde::Serialize;

use crate::error::Result;
use crate::models::{validate_duration, Segment};
use crate::segmentation::config::SegmentationConfig;
use crate::segmentation::merge::dedupe_cuts;

/// Result of running detector output through dedupe and segmentation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    pub duration_secs: f64,
    pub raw_cut_count: usize,
    pub cuts: Vec<f64>,
    pub segments: Vec<Segment>,
}

/// Split `[0, duration)` at the given sorted cut points.
///
/// Cuts must already be sorted and lie strictly inside `(0, duration)`.
/// Consecutive boundaries that do not strictly increase produce no segment.
pub fn to_segments(cuts: &[f64], duration_secs: f64) -> Vec<Segment> {
    if !(duration_secs > 0.0) {
        return Vec::new();
    }

    let boundaries: Vec<f64> = std::iter::once(0.0)
        .chain(cuts.iter().copied())
        .chain(std::iter::once(duration_secs))
        .collect();

    boundaries
        .windows(2)
        .filter(|pair| pair[1] > pair[0])
        .map(|pair| Segment::new(pair[0], pair[1]))
        .collect()
}

/// Main pipeline: raw detector cuts to a contiguous segment list.
pub fn build_timeline(
    raw_cuts: &[f64],
    config: &SegmentationConfig,
    duration_secs: f64,
) -> Result<Timeline> {
    config.validate()?;
    validate_duration(duration_secs)?;

    // Cuts at or beyond the ends would break contiguity, drop them here.
    let cuts: Vec<f64> = dedupe_cuts(raw_cuts, config.dedupe_window_sec)?
        .into_iter()
        .filter(|t| *t > 0.0 && *t < duration_secs)
        .collect();

    let segments = to_segments(&cuts, duration_secs);

    Ok(Timeline {
        duration_secs,
        raw_cut_count: raw_cuts.len(),
        cuts,
        segments,
    })
}
