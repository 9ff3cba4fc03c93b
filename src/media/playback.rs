use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackState {
    Playing,
    Ended,
    Stopped,
    Error,
}

impl PlaybackState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PlaybackState::Ended | PlaybackState::Error)
    }
}

/// Source of "where is the playhead right now".
pub trait PlaybackClock: Send + Sync {
    fn position_secs(&self) -> f64;

    fn state(&self) -> PlaybackState;

    fn stop(&self);
}

/// Optional on-screen viewer launched next to the clock.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub ffplay_bin: PathBuf,
    pub input: PathBuf,
}

/// Run the viewer binary once to make sure it loads before the session starts.
pub fn ensure_available(ffplay_bin: &Path) -> Result<()> {
    let status = Command::new(ffplay_bin)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .with_context(|| format!("playback viewer {} is unavailable", ffplay_bin.display()))?;
    if !status.success() {
        return Err(anyhow!(
            "playback viewer {} is incompatible ('-version' exited with {status})",
            ffplay_bin.display()
        ));
    }
    Ok(())
}

struct ClockInner {
    anchor: Option<Instant>,
    /// Position frozen at stop; combines with `anchor` while playing.
    stopped_at_secs: f64,
    viewer: Option<Child>,
    viewer_failed: bool,
}

/// Playhead derived from wall-clock time since start, clamped to the media
/// duration. When a viewer is attached its exit status drives the state.
pub struct WallClockPlayback {
    duration_secs: f64,
    inner: Mutex<ClockInner>,
}

impl WallClockPlayback {
    pub fn start(duration_secs: f64, viewer: Option<ViewerConfig>) -> Result<Self> {
        let child = match viewer {
            Some(config) => {
                ensure_available(&config.ffplay_bin)?;
                let child = Command::new(&config.ffplay_bin)
                    .args(["-autoexit", "-hide_banner", "-loglevel", "error"])
                    .arg(&config.input)
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .spawn()
                    .with_context(|| {
                        format!("failed to launch viewer for {}", config.input.display())
                    })?;
                Some(child)
            }
            None => None,
        };

        Ok(Self {
            duration_secs,
            inner: Mutex::new(ClockInner {
                anchor: Some(Instant::now()),
                stopped_at_secs: 0.0,
                viewer: child,
                viewer_failed: false,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, ClockInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn elapsed_secs(&self, inner: &ClockInner) -> f64 {
        let raw = match inner.anchor {
            Some(anchor) => anchor.elapsed().as_secs_f64(),
            None => inner.stopped_at_secs,
        };
        raw.min(self.duration_secs)
    }
}

impl PlaybackClock for WallClockPlayback {
    fn position_secs(&self) -> f64 {
        let inner = self.lock();
        self.elapsed_secs(&inner)
    }

    fn state(&self) -> PlaybackState {
        let mut inner = self.lock();
        if inner.anchor.is_none() {
            return PlaybackState::Stopped;
        }

        let viewer_failed = match inner.viewer.as_mut().map(|child| child.try_wait()) {
            Some(Ok(Some(status))) => !status.success(),
            Some(Ok(None)) | None => false,
            Some(Err(err)) => {
                log::warn!("failed to poll viewer process: {err}");
                true
            }
        };
        if viewer_failed {
            inner.viewer_failed = true;
        }

        if inner.viewer_failed {
            PlaybackState::Error
        } else if self.elapsed_secs(&inner) >= self.duration_secs {
            PlaybackState::Ended
        } else {
            PlaybackState::Playing
        }
    }

    fn stop(&self) {
        let mut inner = self.lock();
        let position = self.elapsed_secs(&inner);
        inner.stopped_at_secs = position;
        inner.anchor = None;
        if let Some(mut child) = inner.viewer.take() {
            if let Err(err) = child.kill() {
                log::debug!("viewer already exited: {err}");
            }
            let _ = child.wait();
        }
    }
}

impl Drop for WallClockPlayback {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_clock_advances_and_stops() {
        let clock = WallClockPlayback::start(60.0, None).unwrap();
        assert_eq!(clock.state(), PlaybackState::Playing);
        std::thread::sleep(std::time::Duration::from_millis(20));
        let position = clock.position_secs();
        assert!(position > 0.0 && position < 60.0);

        clock.stop();
        assert_eq!(clock.state(), PlaybackState::Stopped);
        let frozen = clock.position_secs();
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert_eq!(clock.position_secs(), frozen);
    }

    #[test]
    fn test_clock_clamps_to_duration() {
        let clock = WallClockPlayback::start(0.001, None).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert_eq!(clock.position_secs(), 0.001);
        assert_eq!(clock.state(), PlaybackState::Ended);
    }

    #[test]
    fn test_missing_viewer_is_reported() {
        assert!(ensure_available(Path::new("/nonexistent/ffplay-binary")).is_err());
    }
}
