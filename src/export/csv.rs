use crate::export::Rendered;
use crate::models::Span;
use crate::timecode::{format_display_timecode, seconds_to_timecode, FrameRate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvFlavor {
    /// Cut timeline; timecodes are frame-quantized.
    Segments,
    /// Marked highlights; timecodes are millisecond display form.
    Highlights,
}

impl CsvFlavor {
    fn header(self) -> &'static str {
        match self {
            CsvFlavor::Segments => "index,start_sec,end_sec,duration_sec,start_tc,end_tc",
            CsvFlavor::Highlights => "index,in_sec,out_sec,duration_sec,in_tc,out_tc",
        }
    }

    fn timecode(self, seconds: f64, fps: FrameRate) -> String {
        match self {
            CsvFlavor::Segments => seconds_to_timecode(seconds, fps),
            CsvFlavor::Highlights => format_display_timecode(seconds),
        }
    }
}

pub fn render_csv<S: Span>(spans: &[S], flavor: CsvFlavor, fps: FrameRate) -> Rendered {
    let mut lines = vec![flavor.header().to_string()];
    let mut emitted = 0;
    let mut skipped = 0;

    for span in spans {
        if !span.is_well_formed() {
            skipped += 1;
            continue;
        }
        emitted += 1;
        let (start, end) = span.bounds();
        lines.push(format!(
            "{},{:.3},{:.3},{:.3},{},{}",
            emitted,
            start,
            end,
            end - start,
            flavor.timecode(start, fps),
            flavor.timecode(end, fps),
        ));
    }

    Rendered {
        text: lines.join("\n"),
        emitted,
        skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HighlightRange, Segment};

    #[test]
    fn test_segments_csv() {
        let segments = vec![Segment::new(0.0, 2.01), Segment::new(2.01, 5.0)];
        let rendered = render_csv(&segments, CsvFlavor::Segments, FrameRate::FPS_30);
        let lines: Vec<&str> = rendered.text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "index,start_sec,end_sec,duration_sec,start_tc,end_tc");
        assert_eq!(lines[1], "1,0.000,2.010,2.010,00:00:00:00,00:00:02:00");
        assert_eq!(lines[2], "2,2.010,5.000,2.990,00:00:02:00,00:00:05:00");
    }

    #[test]
    fn test_highlights_csv_uses_display_timecode() {
        let ranges = vec![HighlightRange::new(0.7, 1.2)];
        let rendered = render_csv(&ranges, CsvFlavor::Highlights, FrameRate::FPS_30);
        assert_eq!(
            rendered.text,
            "index,in_sec,out_sec,duration_sec,in_tc,out_tc\n\
             1,0.700,1.200,0.500,00:00:00.700,00:00:01.200"
        );
    }

    #[test]
    fn test_skipped_rows_are_counted() {
        let ranges = vec![
            HighlightRange::new(4.0, 3.0),
            HighlightRange::new(1.0, 2.0),
            HighlightRange::new(f64::NAN, 2.0),
        ];
        let rendered = render_csv(&ranges, CsvFlavor::Highlights, FrameRate::FPS_30);
        assert_eq!(rendered.emitted, 1);
        assert_eq!(rendered.skipped, 2);
        assert!(rendered.text.ends_with("1,1.000,2.000,1.000,00:00:01.000,00:00:02.000"));
    }
}
