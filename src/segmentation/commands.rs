use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::export::{default_title, render_csv, render_edl, write_atomic, CsvFlavor, EdlOptions};
use crate::media::{BlankMaster, Prober, SceneDetector, Transcoder};
use crate::models::VideoInfo;
use crate::segmentation::{build_timeline, Timeline};
use crate::settings::TimelineSettings;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_info;

pub const TIMELINE_EDL: &str = "timeline.edl";
pub const SEGMENTS_CSV: &str = "segments.csv";
pub const WHITE_MASTER: &str = "white_master.mp4";

#[derive(Debug, Clone)]
pub struct TimelineRequest {
    pub input: PathBuf,
    pub out_dir: PathBuf,
    pub settings: TimelineSettings,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineArtifacts {
    pub info: VideoInfo,
    pub timeline: Timeline,
    pub edl_path: PathBuf,
    pub csv_path: PathBuf,
    pub white_master: Option<PathBuf>,
}

/// Detect cuts in `input` and write the white-master timeline next to it.
///
/// Everything that can be rejected up front (reel, fps, tunables, missing
/// input) is checked before a tool runs. Any tool failure aborts the whole
/// run. The white master renders to a staging file and is renamed into
/// place only after the EDL and CSV have been written.
pub fn run_timeline<T>(request: &TimelineRequest, tools: &T) -> Result<TimelineArtifacts>
where
    T: SceneDetector + Prober + Transcoder,
{
    let settings = &request.settings;
    let title = settings
        .title
        .clone()
        .unwrap_or_else(|| default_title(settings.fps));
    let edl_options = EdlOptions::new(title, settings.reel.as_str(), settings.fps)?;
    let segmentation = settings.segmentation();
    segmentation.validate()?;

    if !request.input.exists() {
        bail!(
            "input video '{}' not found; pass the sample with -i <path>",
            request.input.display()
        );
    }

    let info = tools
        .probe(&request.input)
        .with_context(|| format!("failed to probe {}", request.input.display()))?;
    let raw_cuts = tools.detect_cuts(&request.input, segmentation.scene_threshold)?;
    let timeline = build_timeline(&raw_cuts, &segmentation, info.duration_secs)?;

    log_summary(&request.input, &info, settings, &timeline);

    let edl = render_edl(&timeline.segments, &edl_options)?;
    let csv = render_csv(&timeline.segments, CsvFlavor::Segments, settings.fps);

    std::fs::create_dir_all(&request.out_dir)
        .with_context(|| format!("failed to create {}", request.out_dir.display()))?;

    let staged_master = if settings.render_white_master {
        Some(render_white_master(tools, &request.out_dir, info, settings)?)
    } else {
        None
    };

    let edl_path = request.out_dir.join(TIMELINE_EDL);
    let csv_path = request.out_dir.join(SEGMENTS_CSV);
    write_atomic(&edl_path, &edl.text)?;
    write_atomic(&csv_path, &csv.text)?;

    // the master only lands once its timeline is on disk
    let white_master = match staged_master {
        Some(staged) => {
            let target = request.out_dir.join(WHITE_MASTER);
            staged
                .persist(&target)
                .map_err(|err| anyhow!("failed to move white master into place: {}", err.error))?;
            Some(target)
        }
        None => None,
    };

    log_info!("=== OUTPUT ===");
    if let Some(path) = &white_master {
        log_info!(" - {}", path.display());
    }
    log_info!(" - {}", edl_path.display());
    log_info!(" - {}", csv_path.display());
    log_tuning_hints(&request.input);

    Ok(TimelineArtifacts {
        info,
        timeline,
        edl_path,
        csv_path,
        white_master,
    })
}

fn render_white_master<T: Transcoder>(
    tools: &T,
    out_dir: &Path,
    info: VideoInfo,
    settings: &TimelineSettings,
) -> Result<NamedTempFile> {
    let staging = tempfile::Builder::new()
        .prefix(".white_master")
        .suffix(".mp4")
        .tempfile_in(out_dir)
        .with_context(|| format!("failed to stage white master in {}", out_dir.display()))?;

    tools.render_blank_master(&BlankMaster {
        output: staging.path().to_path_buf(),
        info,
        fps: settings.fps,
    })?;

    Ok(staging)
}

fn log_summary(input: &Path, info: &VideoInfo, settings: &TimelineSettings, timeline: &Timeline) {
    log_info!("=== INFO ===");
    log_info!("Video: {}", input.display());
    log_info!("Size: {}x{}", info.width, info.height);
    log_info!("Duration: {:.3}s", info.duration_secs);
    log_info!("Template FPS: {}", settings.fps.get());
    log_info!("Scene threshold: {}", settings.scene_threshold);
    log_info!("Dedupe window: {} sec", settings.dedupe_window_sec);
    log_info!("Raw cuts found: {}", timeline.raw_cut_count);
    log_info!("Cuts after dedupe: {}", timeline.cuts.len());
    log_info!("Segments: {}", timeline.segments.len());
}

fn log_tuning_hints(input: &Path) {
    log_info!("Tuning hints:");
    log_info!(" - still missing cuts: lower the threshold (e.g. 0.08, 0.06)");
    log_info!(" - close cuts merged: set the dedupe window to 0 or 0.02");
    log_info!("   cutmark timeline -i {} -t 0.08 -d 0", input.display());
    log_info!("   cutmark timeline -i {} -t 0.06 -d 0.02", input.display());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CutError, Result as CutResult};
    use crate::media::ClipRequest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeTools {
        cuts: Vec<f64>,
        fail_render: bool,
        detect_calls: AtomicUsize,
    }

    impl FakeTools {
        fn new(cuts: Vec<f64>) -> Self {
            Self {
                cuts,
                fail_render: false,
                detect_calls: AtomicUsize::new(0),
            }
        }
    }

    impl Prober for FakeTools {
        fn probe(&self, _input: &Path) -> CutResult<VideoInfo> {
            VideoInfo::new(1920, 1080, 10.0)
        }
    }

    impl SceneDetector for FakeTools {
        fn detect_cuts(&self, _input: &Path, _threshold: f64) -> CutResult<Vec<f64>> {
            self.detect_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.cuts.clone())
        }
    }

    impl Transcoder for FakeTools {
        fn extract_clip(&self, _request: &ClipRequest) -> CutResult<()> {
            Ok(())
        }

        fn render_blank_master(&self, master: &BlankMaster) -> CutResult<()> {
            if self.fail_render {
                return Err(CutError::tool("ffmpeg", "encoder missing"));
            }
            std::fs::write(&master.output, b"white")?;
            Ok(())
        }
    }

    fn request(dir: &Path) -> TimelineRequest {
        let input = dir.join("input.mp4");
        std::fs::write(&input, b"video").unwrap();
        TimelineRequest {
            input,
            out_dir: dir.join("out"),
            settings: TimelineSettings::default(),
        }
    }

    #[test]
    fn test_writes_all_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let tools = FakeTools::new(vec![5.0, 2.03, 2.01]);

        let artifacts = run_timeline(&request(dir.path()), &tools).unwrap();

        assert_eq!(artifacts.timeline.cuts, vec![2.01, 5.0]);
        assert_eq!(artifacts.timeline.segments.len(), 3);
        let edl = std::fs::read_to_string(&artifacts.edl_path).unwrap();
        assert!(edl.starts_with("TITLE: WHITE_TEMPLATE_30FPS\nFCM: NON-DROP FRAME"));
        assert!(edl.contains("003  WHITE"));
        let csv = std::fs::read_to_string(&artifacts.csv_path).unwrap();
        assert!(csv.contains("1,0.000,2.010,2.010,00:00:00:00,00:00:02:00"));
        assert_eq!(
            std::fs::read(artifacts.white_master.unwrap()).unwrap(),
            b"white"
        );
    }

    #[test]
    fn test_long_reel_rejected_before_tools_run() {
        let dir = tempfile::tempdir().unwrap();
        let tools = FakeTools::new(vec![1.0]);
        let mut request = request(dir.path());
        request.settings.reel = "TOOLONGRL".into();

        let err = run_timeline(&request, &tools).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CutError>(),
            Some(CutError::Validation(_))
        ));
        assert_eq!(tools.detect_calls.load(Ordering::SeqCst), 0);
        assert!(!request.out_dir.exists());
    }

    #[test]
    fn test_render_failure_leaves_no_timeline() {
        let dir = tempfile::tempdir().unwrap();
        let mut tools = FakeTools::new(vec![1.0]);
        tools.fail_render = true;
        let request = request(dir.path());

        assert!(run_timeline(&request, &tools).is_err());
        assert!(!request.out_dir.join(TIMELINE_EDL).exists());
        assert!(!request.out_dir.join(WHITE_MASTER).exists());
        assert_eq!(std::fs::read_dir(&request.out_dir).unwrap().count(), 0);
    }

    #[test]
    fn test_failed_csv_write_leaves_no_master() {
        let dir = tempfile::tempdir().unwrap();
        let tools = FakeTools::new(vec![1.0]);
        let request = request(dir.path());
        // a directory where the CSV should go makes the rename fail
        std::fs::create_dir_all(request.out_dir.join(SEGMENTS_CSV)).unwrap();

        assert!(run_timeline(&request, &tools).is_err());
        assert!(!request.out_dir.join(WHITE_MASTER).exists());
        let staged_left = std::fs::read_dir(&request.out_dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .any(|entry| entry.file_name().to_string_lossy().starts_with(".white_master"));
        assert!(!staged_left);
    }

    #[test]
    fn test_no_white_skips_render() {
        let dir = tempfile::tempdir().unwrap();
        let mut tools = FakeTools::new(Vec::new());
        tools.fail_render = true;
        let mut request = request(dir.path());
        request.settings.render_white_master = false;

        let artifacts = run_timeline(&request, &tools).unwrap();
        assert!(artifacts.white_master.is_none());
        assert_eq!(artifacts.timeline.segments.len(), 1);
    }

    #[test]
    fn test_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let request = TimelineRequest {
            input: dir.path().join("nope.mp4"),
            out_dir: dir.path().join("out"),
            settings: TimelineSettings::default(),
        };
        assert!(run_timeline(&request, &FakeTools::new(Vec::new())).is_err());
    }
}
