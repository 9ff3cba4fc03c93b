pub mod algorithm;
pub mod commands;
pub mod config;
pub mod merge;

pub use algorithm::{build_timeline, to_segments, Timeline};
pub use config::SegmentationConfig;
pub use merge::dedupe_cuts;
