//! Rendering of editing artifacts: EDL and CSV text, atomic file writes and
//! the per-highlight clip export.

pub mod clips;
pub mod csv;
pub mod edl;
pub mod files;

pub use clips::{export_highlights, ClipOutcome, ClipResult, ExportPlan, ExportReport};
pub use csv::{render_csv, CsvFlavor};
pub use edl::{default_title, render_edl, validate_reel, EdlOptions};
pub use files::write_atomic;

/// Rendered text plus how many input pairs made it in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    pub emitted: usize,
    /// Pairs dropped because `end <= start`.
    pub skipped: usize,
}
