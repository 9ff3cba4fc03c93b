//! CMX3600-style edit decision list.

use crate::error::{CutError, Result};
use crate::export::Rendered;
use crate::models::Span;
use crate::timecode::{seconds_to_timecode, FrameRate};

/// Field width of the reel column in CMX3600.
pub const MAX_REEL_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct EdlOptions {
    pub title: String,
    pub reel: String,
    pub fps: FrameRate,
}

impl EdlOptions {
    pub fn new(title: impl Into<String>, reel: impl Into<String>, fps: FrameRate) -> Result<Self> {
        let reel = reel.into();
        validate_reel(&reel)?;
        Ok(Self {
            title: title.into(),
            reel,
            fps,
        })
    }
}

pub fn default_title(fps: FrameRate) -> String {
    format!("WHITE_TEMPLATE_{}FPS", fps.get())
}

pub fn validate_reel(reel: &str) -> Result<()> {
    if reel.is_empty() {
        return Err(CutError::validation("reel name must not be empty"));
    }
    if !reel.chars().all(|c| c.is_ascii_graphic()) {
        return Err(CutError::validation(format!(
            "reel name '{reel}' must be printable ASCII without spaces"
        )));
    }
    if reel.len() > MAX_REEL_LEN {
        return Err(CutError::validation(format!(
            "reel name '{reel}' is {} characters, EDL allows at most {MAX_REEL_LEN}",
            reel.len()
        )));
    }
    Ok(())
}

/// Render one cut event per well-formed span.
///
/// Every clip lives on the same base timeline, so source and record
/// timecodes are identical. Event numbers count emitted events only.
pub fn render_edl<S: Span>(spans: &[S], options: &EdlOptions) -> Result<Rendered> {
    validate_reel(&options.reel)?;

    let mut lines = vec![
        format!("TITLE: {}", options.title),
        "FCM: NON-DROP FRAME".to_string(),
        String::new(),
    ];

    let mut emitted = 0;
    let mut skipped = 0;
    for span in spans {
        if !span.is_well_formed() {
            skipped += 1;
            continue;
        }
        emitted += 1;

        let (start, end) = span.bounds();
        let tc_in = seconds_to_timecode(start, options.fps);
        let tc_out = seconds_to_timecode(end, options.fps);

        lines.push(format!(
            "{:03}  {:<8} V     C        {} {} {} {}",
            emitted, options.reel, tc_in, tc_out, tc_in, tc_out
        ));
        lines.push(format!("* FROM CLIP NAME: {}", options.reel));
        lines.push(String::new());
    }

    Ok(Rendered {
        text: lines.join("\n"),
        emitted,
        skipped,
    })
}
