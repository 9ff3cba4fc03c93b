use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::export::{EdlOptions, ExportPlan};
use crate::marks::{
    ExportContext, Keymap, MarkAction, MarkController, MarkState, SessionSummary,
};
use crate::media::{
    playback::ViewerConfig, PlaybackClock, Prober, Transcoder, WallClockPlayback,
};
use crate::settings::{ExportSettings, MarkingSettings};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

pub const EXPORT_EDL_TITLE: &str = "HIGHLIGHTS";

#[derive(Debug, Clone)]
pub struct MarkRequest {
    pub input: PathBuf,
    pub headless: bool,
    pub ffplay_bin: PathBuf,
    pub marking: MarkingSettings,
    pub export: ExportSettings,
    pub keymap: Keymap,
}

/// Run one interactive marking session until Quit or end of input.
///
/// Keys are read line by line from `keys` on a plain thread and fed to the
/// controller queue. Returns once every export started during the session
/// has finished.
pub async fn run_mark_session<T, R>(
    request: MarkRequest,
    tools: Arc<T>,
    keys: R,
) -> Result<SessionSummary>
where
    T: Prober + Transcoder + 'static,
    R: BufRead + Send + 'static,
{
    if !request.input.exists() {
        bail!("input video '{}' not found", request.input.display());
    }
    let edl = EdlOptions::new(EXPORT_EDL_TITLE, request.export.reel.as_str(), request.export.fps)?;

    let info = {
        let tools = Arc::clone(&tools);
        let input = request.input.clone();
        tokio::task::spawn_blocking(move || tools.probe(&input))
            .await
            .context("probe task failed to join")??
    };
    let state = MarkState::new(info.duration_secs, request.marking.roll())?;

    let viewer = (!request.headless).then(|| ViewerConfig {
        ffplay_bin: request.ffplay_bin.clone(),
        input: request.input.clone(),
    });
    let clock: Arc<dyn PlaybackClock> = Arc::new(
        WallClockPlayback::start(info.duration_secs, viewer)
            .context("failed to start playback")?,
    );

    let plan = ExportPlan {
        session_id: Uuid::new_v4(),
        input: request.input.clone(),
        out_dir: request.export.out_dir.clone(),
        mode: request.export.mode(),
        max_parallel: request.export.max_parallel,
        fps: request.export.fps,
        edl: Some(edl),
    };
    let transcoder: Arc<dyn Transcoder> = tools;
    let (controller, worker) = MarkController::spawn(
        state,
        Arc::clone(&clock),
        ExportContext { plan, transcoder },
        request.marking.queue_capacity,
        request.marking.step_sec,
    );

    print_banner(&request, info.duration_secs);

    let cancel_token = CancellationToken::new();
    let monitor = tokio::spawn(watch_playback(
        Arc::clone(&clock),
        Duration::from_millis(request.marking.poll_interval_ms.max(1)),
        cancel_token.clone(),
    ));
    // Never joined: a thread blocked on a terminal read cannot be woken.
    let _reader = spawn_key_reader(keys, request.keymap.clone(), controller);

    let summary = worker.await.context("mark session worker failed")?;

    cancel_token.cancel();
    if let Err(err) = monitor.await {
        log_error!("playback monitor ended abnormally: {err}");
    }
    clock.stop();

    log_info!(
        "Session over: {} highlight(s), {} export(s)",
        summary.highlights.len(),
        summary.exports.len()
    );
    Ok(summary)
}

/// Map input lines to actions until Quit or end of input, which also quits.
pub fn spawn_key_reader<R>(
    keys: R,
    keymap: Keymap,
    controller: MarkController,
) -> std::thread::JoinHandle<()>
where
    R: BufRead + Send + 'static,
{
    std::thread::spawn(move || {
        for line in keys.lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    log_warn!("failed to read key input: {err}");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            let Some(action) = keymap.lookup(&line) else {
                log_warn!("Unknown key '{}'", line.trim());
                continue;
            };
            if controller.submit_blocking(action).is_err() || action == MarkAction::Quit {
                return;
            }
        }
        // end of input; harmless if the session already quit
        let _ = controller.submit_blocking(MarkAction::Quit);
    })
}

async fn watch_playback(
    clock: Arc<dyn PlaybackClock>,
    poll: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut reported = false;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let state = clock.state();
                if state.is_terminal() && !reported {
                    log_info!("Player state: {state:?}. Press E to export, Q to quit.");
                    reported = true;
                }
            }
            _ = cancel_token.cancelled() => {
                log::debug!("playback monitor shutting down");
                break;
            }
        }
    }
}

fn print_banner(request: &MarkRequest, duration_secs: f64) {
    let keys = |action: MarkAction| request.keymap.keys_for(action).join("/");

    log_info!("=== HIGHLIGHT MARKER ===");
    log_info!("Video: {} ({:.3}s)", request.input.display(), duration_secs);
    log_info!("{}", request.marking.roll());
    log_info!(
        "{}=IN  {}=OUT  {}=UNDO  {}=PRINT  {}=EXPORT  {}=QUIT",
        keys(MarkAction::In),
        keys(MarkAction::Out),
        keys(MarkAction::Undo),
        keys(MarkAction::Print),
        keys(MarkAction::Export),
        keys(MarkAction::Quit)
    );
    log_info!(
        "{}=ROLL on/off  {} / {}=pre-roll -/+  {} / {}=post-roll -/+ (step {:.2}s)",
        keys(MarkAction::ToggleRoll),
        keys(MarkAction::PreRollDown),
        keys(MarkAction::PreRollUp),
        keys(MarkAction::PostRollDown),
        keys(MarkAction::PostRollUp),
        request.marking.step_sec
    );
    log_info!("Type a key and press Enter.");
}
