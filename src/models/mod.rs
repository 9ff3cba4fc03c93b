pub mod probe;
pub mod range;

pub use probe::{validate_duration, VideoInfo};
pub use range::{HighlightRange, Segment, Span};
