use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::export::csv::{render_csv, CsvFlavor};
use crate::export::edl::{render_edl, EdlOptions};
use crate::export::files::write_atomic;
use crate::marks::RollConfig;
use crate::media::{ClipRequest, ExtractMode, Transcoder};
use crate::models::{HighlightRange, Span};
use crate::timecode::{format_display_timecode, FrameRate};

pub const INDEX_CSV: &str = "highlights.csv";
pub const INDEX_EDL: &str = "highlights.edl";
pub const MANIFEST_JSON: &str = "highlights.json";

/// Everything an export needs besides the ranges themselves.
#[derive(Debug, Clone)]
pub struct ExportPlan {
    pub session_id: Uuid,
    pub input: PathBuf,
    pub out_dir: PathBuf,
    pub mode: ExtractMode,
    pub max_parallel: usize,
    pub fps: FrameRate,
    pub edl: Option<EdlOptions>,
}

pub fn clip_file_name(index: usize) -> String {
    format!("HL_{index:03}.mp4")
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum ClipOutcome {
    Exported { path: PathBuf },
    Failed { path: PathBuf, message: String },
    Skipped { reason: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipResult {
    /// 1-based position in the exported snapshot.
    pub index: usize,
    pub range: HighlightRange,
    pub outcome: ClipOutcome,
}

impl ClipResult {
    pub fn is_exported(&self) -> bool {
        matches!(self.outcome, ClipOutcome::Exported { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportReport {
    pub session_id: Uuid,
    pub exported_at: DateTime<Utc>,
    pub source: PathBuf,
    pub mode: ExtractMode,
    pub roll: RollConfig,
    pub clips: Vec<ClipResult>,
    pub csv_path: PathBuf,
    pub edl_path: Option<PathBuf>,
    pub index_rows_skipped: usize,
}

impl ExportReport {
    pub fn exported_count(&self) -> usize {
        self.clips.iter().filter(|clip| clip.is_exported()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.clips
            .iter()
            .filter(|clip| matches!(clip.outcome, ClipOutcome::Failed { .. }))
            .count()
    }
}

/// Cut one clip per range, then write the CSV index, optional EDL and JSON manifest.
///
/// Extractions run in parallel up to `max_parallel`. A failing range is
/// recorded and the rest continue; the index files are written whatever
/// the individual outcomes were. Returns `None` when there is nothing to export.
pub async fn export_highlights(
    highlights: Vec<HighlightRange>,
    roll: RollConfig,
    plan: &ExportPlan,
    transcoder: Arc<dyn Transcoder>,
) -> Result<Option<ExportReport>> {
    if highlights.is_empty() {
        log::info!("No highlights to export.");
        return Ok(None);
    }

    tokio::fs::create_dir_all(&plan.out_dir)
        .await
        .with_context(|| format!("failed to create {}", plan.out_dir.display()))?;

    log::info!("=== EXPORT {} highlight(s) ===", highlights.len());
    let clips = extract_all(&highlights, plan, transcoder).await;

    let report = write_index_files(highlights, clips, roll, plan.clone()).await?;
    log::info!(
        "Saved: {} ({} of {} clips exported)",
        report.csv_path.display(),
        report.exported_count(),
        report.clips.len()
    );
    Ok(Some(report))
}

async fn extract_all(
    highlights: &[HighlightRange],
    plan: &ExportPlan,
    transcoder: Arc<dyn Transcoder>,
) -> Vec<ClipResult> {
    let permits = Arc::new(Semaphore::new(plan.max_parallel.max(1)));
    let mut tasks = JoinSet::new();
    let mut results = Vec::with_capacity(highlights.len());
    let mut spawned: Vec<(usize, HighlightRange, PathBuf)> = Vec::new();

    for (offset, range) in highlights.iter().copied().enumerate() {
        let index = offset + 1;
        if !range.is_well_formed() {
            log::warn!("Skip {}: OUT <= IN", clip_file_name(index));
            results.push(ClipResult {
                index,
                range,
                outcome: ClipOutcome::Skipped {
                    reason: "OUT <= IN".into(),
                },
            });
            continue;
        }

        let request = ClipRequest {
            input: plan.input.clone(),
            start: range.in_point,
            end: range.out_point,
            output: plan.out_dir.join(clip_file_name(index)),
            mode: plan.mode,
        };
        spawned.push((index, range, request.output.clone()));
        let permits = Arc::clone(&permits);
        let transcoder = Arc::clone(&transcoder);

        tasks.spawn(async move {
            let outcome = match permits.acquire_owned().await {
                Ok(_permit) => {
                    let output = request.output.clone();
                    let joined =
                        tokio::task::spawn_blocking(move || transcoder.extract_clip(&request))
                            .await;
                    match joined {
                        Ok(Ok(())) => ClipOutcome::Exported { path: output },
                        Ok(Err(err)) => ClipOutcome::Failed {
                            path: output,
                            message: err.to_string(),
                        },
                        Err(join_err) => ClipOutcome::Failed {
                            path: output,
                            message: format!("extraction worker panicked: {join_err}"),
                        },
                    }
                }
                Err(closed) => ClipOutcome::Failed {
                    path: request.output.clone(),
                    message: closed.to_string(),
                },
            };
            log_outcome(index, &range, &outcome);
            ClipResult {
                index,
                range,
                outcome,
            }
        });
    }

    let mut join_errors = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(result) => results.push(result),
            Err(err) => {
                log::error!("clip export task failed to join: {err}");
                join_errors.push(err.to_string());
            }
        }
    }

    fill_unjoined(&mut results, spawned, &join_errors);
    results.sort_by_key(|result| result.index);
    results
}

/// A task that never reported still owes its range a row.
fn fill_unjoined(
    results: &mut Vec<ClipResult>,
    spawned: Vec<(usize, HighlightRange, PathBuf)>,
    join_errors: &[String],
) {
    for (index, range, path) in spawned {
        if results.iter().any(|result| result.index == index) {
            continue;
        }
        let outcome = ClipOutcome::Failed {
            path,
            message: format!("clip task failed to join: {}", join_errors.join("; ")),
        };
        log_outcome(index, &range, &outcome);
        results.push(ClipResult {
            index,
            range,
            outcome,
        });
    }
}

fn log_outcome(index: usize, range: &HighlightRange, outcome: &ClipOutcome) {
    match outcome {
        ClipOutcome::Exported { .. } => log::info!(
            "OK  {}  [{} -> {}]  dur={:.3}s",
            clip_file_name(index),
            format_display_timecode(range.in_point),
            format_display_timecode(range.out_point),
            range.duration_secs()
        ),
        ClipOutcome::Failed { message, .. } => {
            log::error!("FAIL {}\n{}", clip_file_name(index), message)
        }
        ClipOutcome::Skipped { reason } => {
            log::warn!("Skip {}: {}", clip_file_name(index), reason)
        }
    }
}

async fn write_index_files(
    highlights: Vec<HighlightRange>,
    clips: Vec<ClipResult>,
    roll: RollConfig,
    plan: ExportPlan,
) -> Result<ExportReport> {
    tokio::task::spawn_blocking(move || -> Result<ExportReport> {
        let csv = render_csv(&highlights, CsvFlavor::Highlights, plan.fps);
        let csv_path = plan.out_dir.join(INDEX_CSV);
        write_atomic(&csv_path, &csv.text)?;

        let edl_path = match &plan.edl {
            Some(options) => {
                let edl = render_edl(&highlights, options)?;
                let path = plan.out_dir.join(INDEX_EDL);
                write_atomic(&path, &edl.text)?;
                Some(path)
            }
            None => None,
        };

        let report = ExportReport {
            session_id: plan.session_id,
            exported_at: Utc::now(),
            source: plan.input.clone(),
            mode: plan.mode,
            roll,
            clips,
            csv_path,
            edl_path,
            index_rows_skipped: csv.skipped,
        };
        write_manifest(&plan.out_dir.join(MANIFEST_JSON), &report)?;
        Ok(report)
    })
    .await
    .context("index writer task failed to join")?
}

fn write_manifest(path: &Path, report: &ExportReport) -> Result<()> {
    let serialized = serde_json::to_string_pretty(report)?;
    write_atomic(path, &serialized)
}
