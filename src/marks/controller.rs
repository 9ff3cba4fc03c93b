use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde::Serialize;
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
};

use crate::export::{export_highlights, ExportPlan, ExportReport};
use crate::media::{PlaybackClock, Transcoder};
use crate::models::{HighlightRange, Span};
use crate::timecode::format_display_timecode;

use super::keymap::MarkAction;
use super::state::{MarkCommand, MarkEvent, MarkState, Rejection, RollConfig};

/// Where Export commands send their snapshot.
#[derive(Clone)]
pub struct ExportContext {
    pub plan: ExportPlan,
    pub transcoder: Arc<dyn Transcoder>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub highlights: Vec<HighlightRange>,
    pub exports: Vec<ExportReport>,
    pub export_failures: Vec<String>,
}

/// Front door of the mark engine. Cloneable; every clone feeds the same
/// bounded queue, which a single worker drains in order.
#[derive(Clone)]
pub struct MarkController {
    state: Arc<Mutex<MarkState>>,
    clock: Arc<dyn PlaybackClock>,
    tx: mpsc::Sender<MarkCommand>,
    step_sec: f64,
}

impl MarkController {
    /// Start the worker. The returned handle resolves once Quit has been
    /// processed (or every sender is gone) and in-flight exports have settled.
    pub fn spawn(
        state: MarkState,
        clock: Arc<dyn PlaybackClock>,
        export: ExportContext,
        queue_capacity: usize,
        step_sec: f64,
    ) -> (Self, JoinHandle<SessionSummary>) {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let state = Arc::new(Mutex::new(state));

        let worker = tokio::spawn(command_loop(Arc::clone(&state), rx, export));

        (
            Self {
                state,
                clock,
                tx,
                step_sec,
            },
            worker,
        )
    }

    /// Turn a key action into a command. The playhead is read here, once.
    pub fn command_for(&self, action: MarkAction) -> MarkCommand {
        match action {
            MarkAction::In => MarkCommand::SetIn {
                now: self.clock.position_secs(),
            },
            MarkAction::Out => MarkCommand::SetOut {
                now: self.clock.position_secs(),
            },
            MarkAction::Undo => MarkCommand::Undo,
            MarkAction::Print => MarkCommand::Print,
            MarkAction::Export => MarkCommand::Export,
            MarkAction::Quit => MarkCommand::Quit,
            MarkAction::ToggleRoll => MarkCommand::ToggleRoll,
            MarkAction::PreRollDown => MarkCommand::AdjustPreRoll(-self.step_sec),
            MarkAction::PreRollUp => MarkCommand::AdjustPreRoll(self.step_sec),
            MarkAction::PostRollDown => MarkCommand::AdjustPostRoll(-self.step_sec),
            MarkAction::PostRollUp => MarkCommand::AdjustPostRoll(self.step_sec),
        }
    }

    pub async fn submit(&self, action: MarkAction) -> Result<()> {
        let command = self.command_for(action);
        self.tx
            .send(command)
            .await
            .map_err(|_| anyhow!("mark session has ended"))
    }

    /// For producers living on plain threads (the key reader).
    pub fn submit_blocking(&self, action: MarkAction) -> Result<()> {
        let command = self.command_for(action);
        self.tx
            .blocking_send(command)
            .map_err(|_| anyhow!("mark session has ended"))
    }

    pub async fn snapshot(&self) -> MarkState {
        self.state.lock().await.clone()
    }
}

/// One export at a time, in request order, so a later snapshot's index is
/// never overwritten by an earlier, slower one.
async fn export_worker(
    mut rx: mpsc::UnboundedReceiver<(Vec<HighlightRange>, RollConfig)>,
    export: ExportContext,
) -> (Vec<ExportReport>, Vec<String>) {
    let mut reports = Vec::new();
    let mut failures = Vec::new();

    while let Some((snapshot, roll)) = rx.recv().await {
        let transcoder = Arc::clone(&export.transcoder);
        match export_highlights(snapshot, roll, &export.plan, transcoder).await {
            Ok(Some(report)) => reports.push(report),
            Ok(None) => {}
            Err(err) => {
                log::error!("Export failed: {err:#}");
                failures.push(format!("{err:#}"));
            }
        }
    }

    (reports, failures)
}

async fn command_loop(
    state: Arc<Mutex<MarkState>>,
    mut rx: mpsc::Receiver<MarkCommand>,
    export: ExportContext,
) -> SessionSummary {
    let (export_tx, export_rx) = mpsc::unbounded_channel();
    let exporter = tokio::spawn(export_worker(export_rx, export));
    let mut requested = 0usize;

    while let Some(command) = rx.recv().await {
        let (result, roll) = {
            let mut guard = state.lock().await;
            let result = guard.apply(command);
            (result, guard.roll())
        };

        match result {
            Ok(MarkEvent::ExportRequested(snapshot)) => {
                requested += 1;
                if export_tx.send((snapshot, roll)).is_err() {
                    log::error!("Export worker is gone; export dropped");
                }
            }
            Ok(MarkEvent::QuitRequested) => {
                log::info!("Quitting...");
                break;
            }
            Ok(event) => report_event(&event),
            Err(rejection) => report_rejection(&rejection),
        }
    }
    rx.close();
    drop(export_tx);

    let mut summary = SessionSummary {
        highlights: state.lock().await.committed().to_vec(),
        exports: Vec::new(),
        export_failures: Vec::new(),
    };

    if requested > 0 {
        log::info!("Waiting for {requested} export(s) to finish...");
    }
    match exporter.await {
        Ok((reports, failures)) => {
            summary.exports = reports;
            summary.export_failures = failures;
        }
        Err(err) => {
            log::error!("Export worker failed to join: {err}");
            summary.export_failures.push(err.to_string());
        }
    }

    summary
}

fn rolled_tag(rolled: bool) -> &'static str {
    if rolled {
        " (rolled)"
    } else {
        ""
    }
}

fn report_event(event: &MarkEvent) {
    match event {
        MarkEvent::InSet {
            in_point,
            now,
            rolled,
        } => log::info!(
            "IN  = {}{} | now={}",
            format_display_timecode(*in_point),
            rolled_tag(*rolled),
            format_display_timecode(*now)
        ),
        MarkEvent::Saved {
            index,
            range,
            now,
            rolled,
        } => log::info!(
            "SAVED HL_{:03}: [{} -> {}] dur={:.3}s{} | now={}",
            index,
            format_display_timecode(range.in_point),
            format_display_timecode(range.out_point),
            range.duration_secs(),
            rolled_tag(*rolled),
            format_display_timecode(*now)
        ),
        MarkEvent::Undone(range) => log::info!(
            "UNDO last: [{} -> {}]",
            format_display_timecode(range.in_point),
            format_display_timecode(range.out_point)
        ),
        MarkEvent::RollChanged(roll) => log::info!("{roll}"),
        MarkEvent::Listing { highlights, roll } => {
            if highlights.is_empty() {
                log::info!("No highlights yet.");
                return;
            }
            log::info!("=== HIGHLIGHTS ===");
            for (i, range) in highlights.iter().enumerate() {
                log::info!(
                    "HL_{:03}: {} -> {}  dur={:.3}s",
                    i + 1,
                    format_display_timecode(range.in_point),
                    format_display_timecode(range.out_point),
                    range.duration_secs()
                );
            }
            log::info!("=== {roll} ===");
        }
        MarkEvent::ExportRequested(_) | MarkEvent::QuitRequested => {}
    }
}

fn report_rejection(rejection: &Rejection) {
    log::warn!("{rejection}");
}
