use crate::error::Result;
use crate::segmentation::config::validate_window;

fn to_millis(seconds: f64) -> i64 {
    (seconds * 1000.0).round() as i64
}

/// Whole milliseconds covering the window, rounded up so kept cuts are never
/// closer than the requested window.
fn window_millis(window_sec: f64) -> i64 {
    ((window_sec * 1000.0 - 1e-9).ceil() as i64).max(0)
}

fn from_millis(millis: i64) -> f64 {
    millis as f64 / 1000.0
}

/// Collapse detector noise into a strictly increasing list of cut points.
///
/// Timestamps are quantized to milliseconds before comparison, so feeding the
/// output back in with the same window returns it unchanged. With a positive
/// window the scan is greedy: the first cut of a cluster is kept and anything
/// closer than `window_sec` to the last kept cut is dropped.
pub fn dedupe_cuts(raw_cuts: &[f64], window_sec: f64) -> Result<Vec<f64>> {
    validate_window(window_sec)?;

    let mut millis: Vec<i64> = raw_cuts
        .iter()
        .copied()
        .filter(|t| t.is_finite() && *t >= 0.0)
        .map(to_millis)
        .collect();
    millis.sort_unstable();

    let window_ms = window_millis(window_sec);
    if window_ms == 0 {
        millis.dedup();
        return Ok(millis.into_iter().map(from_millis).collect());
    }

    let mut kept: Vec<i64> = Vec::with_capacity(millis.len());
    for t in millis {
        match kept.last() {
            Some(last) if t - last < window_ms => {}
            _ => kept.push(t),
        }
    }

    Ok(kept.into_iter().map(from_millis).collect())
}
