use serde::{Deserialize, Serialize};

/// Anything with a `[start, end)` extent on the source timeline.
pub trait Span {
    fn bounds(&self) -> (f64, f64);

    fn duration_secs(&self) -> f64 {
        let (start, end) = self.bounds();
        end - start
    }

    /// `end > start` with both ends finite.
    fn is_well_formed(&self) -> bool {
        let (start, end) = self.bounds();
        start.is_finite() && end.is_finite() && end > start
    }
}

/// One contiguous piece of the cut timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub start: f64,
    pub end: f64,
}

impl Segment {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }
}

impl Span for Segment {
    fn bounds(&self) -> (f64, f64) {
        (self.start, self.end)
    }
}

/// An operator-marked clip. Unlike segments, ranges may overlap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightRange {
    pub in_point: f64,
    pub out_point: f64,
}

impl HighlightRange {
    pub fn new(in_point: f64, out_point: f64) -> Self {
        Self {
            in_point,
            out_point,
        }
    }
}

impl Span for HighlightRange {
    fn bounds(&self) -> (f64, f64) {
        (self.in_point, self.out_point)
    }
}

impl From<(f64, f64)> for Segment {
    fn from((start, end): (f64, f64)) -> Self {
        Segment::new(start, end)
    }
}

impl From<(f64, f64)> for HighlightRange {
    fn from((in_point, out_point): (f64, f64)) -> Self {
        HighlightRange::new(in_point, out_point)
    }
}
