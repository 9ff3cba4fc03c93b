use cutmark_lib::error::CutError;
use cutmark_lib::export::{render_csv, render_edl, CsvFlavor, EdlOptions};
use cutmark_lib::marks::{MarkCommand, MarkState, Rejection, RollConfig};
use cutmark_lib::models::{HighlightRange, Segment};
use cutmark_lib::segmentation::{build_timeline, dedupe_cuts, to_segments, SegmentationConfig};
use cutmark_lib::timecode::{frames_to_timecode, seconds_to_frames, FrameRate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_cuts(rng: &mut StdRng, duration: f64) -> Vec<f64> {
    let count = rng.gen_range(0..40);
    (0..count)
        .map(|_| {
            // a few out-of-range points to exercise the filtering
            if rng.gen_bool(0.1) {
                duration + rng.gen_range(0.0..2.0)
            } else {
                rng.gen_range(0.0..duration)
            }
        })
        .collect()
}

#[test]
fn scenario_near_duplicate_cuts() {
    let config = SegmentationConfig {
        scene_threshold: 0.10,
        dedupe_window_sec: 0.05,
    };
    let timeline = build_timeline(&[2.01, 2.03, 5.0], &config, 10.0).unwrap();

    assert_eq!(timeline.cuts, vec![2.01, 5.0]);
    assert_eq!(
        timeline.segments,
        vec![
            Segment::new(0.0, 2.01),
            Segment::new(2.01, 5.0),
            Segment::new(5.0, 10.0)
        ]
    );
}

#[test]
fn segments_cover_duration_contiguously() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..200 {
        let duration = rng.gen_range(0.5..120.0);
        let window = if rng.gen_bool(0.3) {
            0.0
        } else {
            rng.gen_range(0.0..1.0)
        };
        let config = SegmentationConfig {
            scene_threshold: 0.1,
            dedupe_window_sec: window,
        };
        let raw = random_cuts(&mut rng, duration);
        let timeline = build_timeline(&raw, &config, duration).unwrap();
        let segments = &timeline.segments;

        assert!(!segments.is_empty());
        assert_eq!(segments.first().unwrap().start, 0.0);
        assert_eq!(segments.last().unwrap().end, duration);
        for pair in segments.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert!(segments.iter().all(|s| s.end > s.start));
        assert_eq!(segments.len(), timeline.cuts.len() + 1);
    }
}

#[test]
fn dedupe_keeps_spacing_and_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..200 {
        // not whole milliseconds, on purpose
        let window = rng.gen_range(0.0001..0.5);
        let raw = random_cuts(&mut rng, 30.0);

        let once = dedupe_cuts(&raw, window).unwrap();
        let twice = dedupe_cuts(&once, window).unwrap();
        assert_eq!(once, twice);
        assert_eq!(to_segments(&once, 40.0), to_segments(&twice, 40.0));

        for pair in once.windows(2) {
            assert!(
                pair[1] - pair[0] >= window - 1e-9,
                "{pair:?} closer than {window}"
            );
        }
    }
}

#[test]
fn frame_round_trip() {
    for fps in [24, 25, 30, 50, 60] {
        let rate = FrameRate::new(fps).unwrap();
        for frames in (0..100_000u64).step_by(97) {
            let seconds = frames as f64 / f64::from(fps);
            assert_eq!(seconds_to_frames(seconds, rate), frames);
        }
    }
    assert_eq!(frames_to_timecode(95, FrameRate::FPS_30), "00:00:03:05");
}

#[test]
fn long_reel_rejected() {
    let err = EdlOptions::new("T", "NINECHARS", FrameRate::FPS_30).unwrap_err();
    assert!(matches!(err, CutError::Validation(_)));
}

#[test]
fn formatters_skip_degenerate_ranges_and_renumber() {
    let ranges = vec![
        HighlightRange::new(1.0, 2.0),
        HighlightRange::new(3.0, 3.0),
        HighlightRange::new(4.0, 5.5),
    ];
    let options = EdlOptions::new("HIGHLIGHTS", "HILITE", FrameRate::FPS_30).unwrap();

    let edl = render_edl(&ranges, &options).unwrap();
    assert_eq!(edl.emitted, 2);
    assert_eq!(edl.skipped, 1);
    assert!(edl.text.contains("002  HILITE   V     C        00:00:04:00 00:00:05:15"));

    let csv = render_csv(&ranges, CsvFlavor::Highlights, FrameRate::FPS_30);
    let rows: Vec<&str> = csv.text.lines().collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2], "2,4.000,5.500,1.500,00:00:04.000,00:00:05.500");
}

#[test]
fn marking_scenario_with_roll() {
    let mut state = MarkState::new(10.0, RollConfig::new(true, 0.3, 0.2)).unwrap();

    assert_eq!(
        state.apply(MarkCommand::SetOut { now: 1.0 }),
        Err(Rejection::NoPendingIn)
    );
    state.apply(MarkCommand::SetIn { now: 1.0 }).unwrap();
    state.apply(MarkCommand::SetOut { now: 1.0 }).unwrap();

    let range = state.committed()[0];
    assert!((range.in_point - 0.7).abs() < 1e-9);
    assert!((range.out_point - 1.2).abs() < 1e-9);

    state.apply(MarkCommand::Undo).unwrap();
    assert_eq!(state.apply(MarkCommand::Undo), Err(Rejection::NothingToUndo));
}
