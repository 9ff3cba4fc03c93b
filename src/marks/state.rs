use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Result;
use crate::models::{validate_duration, HighlightRange};
use crate::timecode::{clamp, format_display_timecode};

/// Reaction-latency compensation applied to marked positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollConfig {
    pub enabled: bool,
    pub pre_roll_sec: f64,
    pub post_roll_sec: f64,
}

impl Default for RollConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pre_roll_sec: 0.30,
            post_roll_sec: 0.20,
        }
    }
}

impl RollConfig {
    pub fn new(enabled: bool, pre_roll_sec: f64, post_roll_sec: f64) -> Self {
        Self {
            enabled,
            pre_roll_sec: pre_roll_sec.max(0.0),
            post_roll_sec: post_roll_sec.max(0.0),
        }
    }
}

impl fmt::Display for RollConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ROLL={} | pre={:.2}s | post={:.2}s",
            if self.enabled { "ON" } else { "OFF" },
            self.pre_roll_sec,
            self.post_roll_sec
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarkCommand {
    SetIn { now: f64 },
    SetOut { now: f64 },
    Undo,
    Print,
    Export,
    Quit,
    ToggleRoll,
    AdjustPreRoll(f64),
    AdjustPostRoll(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MarkEvent {
    InSet {
        in_point: f64,
        now: f64,
        rolled: bool,
    },
    Saved {
        index: usize,
        range: HighlightRange,
        now: f64,
        rolled: bool,
    },
    Undone(HighlightRange),
    RollChanged(RollConfig),
    Listing {
        highlights: Vec<HighlightRange>,
        roll: RollConfig,
    },
    ExportRequested(Vec<HighlightRange>),
    QuitRequested,
}

/// A command that was understood but not applied.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum Rejection {
    #[error("OUT ignored: no IN point set (press IN first)")]
    NoPendingIn,

    #[error(
        "OUT ignored: OUT ({}) <= IN ({})",
        display_tc(.out_point),
        display_tc(.in_point)
    )]
    OutNotAfterIn { in_point: f64, out_point: f64 },

    #[error("UNDO: no highlights to remove")]
    NothingToUndo,
}

fn display_tc(seconds: &f64) -> String {
    format_display_timecode(*seconds)
}

/// Pending in-point, committed highlights and roll policy for one session.
#[derive(Debug, Clone)]
pub struct MarkState {
    duration_secs: f64,
    roll: RollConfig,
    pending_in: Option<f64>,
    committed: Vec<HighlightRange>,
}

impl MarkState {
    pub fn new(duration_secs: f64, roll: RollConfig) -> Result<Self> {
        validate_duration(duration_secs)?;
        Ok(Self {
            duration_secs,
            roll,
            pending_in: None,
            committed: Vec::new(),
        })
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    pub fn roll(&self) -> RollConfig {
        self.roll
    }

    pub fn pending_in(&self) -> Option<f64> {
        self.pending_in
    }

    pub fn committed(&self) -> &[HighlightRange] {
        &self.committed
    }

    pub fn compute_in(&self, now: f64) -> f64 {
        let target = if self.roll.enabled {
            now - self.roll.pre_roll_sec
        } else {
            now
        };
        clamp(target, 0.0, self.duration_secs)
    }

    pub fn compute_out(&self, now: f64) -> f64 {
        let target = if self.roll.enabled {
            now + self.roll.post_roll_sec
        } else {
            now
        };
        clamp(target, 0.0, self.duration_secs)
    }

    /// Apply one command. Rejections leave the state untouched, except that
    /// undo always drops the pending in-point.
    pub fn apply(&mut self, command: MarkCommand) -> std::result::Result<MarkEvent, Rejection> {
        match command {
            MarkCommand::SetIn { now } => {
                let in_point = self.compute_in(now);
                self.pending_in = Some(in_point);
                Ok(MarkEvent::InSet {
                    in_point,
                    now,
                    rolled: self.roll.enabled,
                })
            }
            MarkCommand::SetOut { now } => {
                let out_point = self.compute_out(now);
                let in_point = self.pending_in.ok_or(Rejection::NoPendingIn)?;
                if out_point <= in_point {
                    return Err(Rejection::OutNotAfterIn {
                        in_point,
                        out_point,
                    });
                }

                let range = HighlightRange::new(in_point, out_point);
                self.committed.push(range);
                self.pending_in = None;
                Ok(MarkEvent::Saved {
                    index: self.committed.len(),
                    range,
                    now,
                    rolled: self.roll.enabled,
                })
            }
            MarkCommand::Undo => {
                self.pending_in = None;
                self.committed
                    .pop()
                    .map(MarkEvent::Undone)
                    .ok_or(Rejection::NothingToUndo)
            }
            MarkCommand::ToggleRoll => {
                // A pending IN was computed under the old policy.
                self.roll.enabled = !self.roll.enabled;
                self.pending_in = None;
                Ok(MarkEvent::RollChanged(self.roll))
            }
            MarkCommand::AdjustPreRoll(delta) => {
                self.roll.pre_roll_sec = (self.roll.pre_roll_sec + delta).max(0.0);
                Ok(MarkEvent::RollChanged(self.roll))
            }
            MarkCommand::AdjustPostRoll(delta) => {
                self.roll.post_roll_sec = (self.roll.post_roll_sec + delta).max(0.0);
                Ok(MarkEvent::RollChanged(self.roll))
            }
            MarkCommand::Print => Ok(MarkEvent::Listing {
                highlights: self.committed.clone(),
                roll: self.roll,
            }),
            MarkCommand::Export => Ok(MarkEvent::ExportRequested(self.committed.clone())),
            MarkCommand::Quit => Ok(MarkEvent::QuitRequested),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn state() -> MarkState {
        MarkState::new(10.0, RollConfig::new(true, 0.3, 0.2)).unwrap()
    }

    #[test]
    fn test_rolled_in_and_out() {
        let mut state = state();

        let event = state.apply(MarkCommand::SetIn { now: 1.0 }).unwrap();
        assert!(matches!(event, MarkEvent::InSet { rolled: true, .. }));
        assert!(approx(state.pending_in().unwrap(), 0.7));

        let event = state.apply(MarkCommand::SetOut { now: 1.0 }).unwrap();
        match event {
            MarkEvent::Saved { index, range, .. } => {
                assert_eq!(index, 1);
                assert!(approx(range.in_point, 0.7));
                assert!(approx(range.out_point, 1.2));
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(state.pending_in(), None);
        assert_eq!(state.committed().len(), 1);
    }

    #[test]
    fn test_out_without_in_never_commits() {
        let mut state = state();
        let err = state.apply(MarkCommand::SetOut { now: 3.0 }).unwrap_err();
        assert_eq!(err, Rejection::NoPendingIn);
        assert!(state.committed().is_empty());
    }

    #[test]
    fn test_out_not_after_in_rejected() {
        let mut state = MarkState::new(10.0, RollConfig::new(false, 0.3, 0.2)).unwrap();
        state.apply(MarkCommand::SetIn { now: 5.0 }).unwrap();

        let err = state.apply(MarkCommand::SetOut { now: 4.0 }).unwrap_err();
        assert_eq!(
            err,
            Rejection::OutNotAfterIn {
                in_point: 5.0,
                out_point: 4.0
            }
        );
        // pending in survives a rejected OUT
        assert_eq!(state.pending_in(), Some(5.0));
        assert!(state.committed().is_empty());
    }

    #[test]
    fn test_undo_on_empty_clears_pending() {
        let mut state = state();
        state.apply(MarkCommand::SetIn { now: 2.0 }).unwrap();

        let err = state.apply(MarkCommand::Undo).unwrap_err();
        assert_eq!(err, Rejection::NothingToUndo);
        assert_eq!(state.pending_in(), None);
        assert!(state.committed().is_empty());
    }

    #[test]
    fn test_undo_pops_last() {
        let mut state = state();
        for now in [1.0, 4.0] {
            state.apply(MarkCommand::SetIn { now }).unwrap();
            state.apply(MarkCommand::SetOut { now: now + 1.0 }).unwrap();
        }

        let event = state.apply(MarkCommand::Undo).unwrap();
        match event {
            MarkEvent::Undone(range) => assert!(approx(range.in_point, 3.7)),
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(state.committed().len(), 1);
    }

    #[test]
    fn test_toggle_roll_discards_pending_in() {
        let mut state = state();
        state.apply(MarkCommand::SetIn { now: 2.0 }).unwrap();

        let event = state.apply(MarkCommand::ToggleRoll).unwrap();
        assert!(matches!(event, MarkEvent::RollChanged(RollConfig { enabled: false, .. })));

        let err = state.apply(MarkCommand::SetOut { now: 3.0 }).unwrap_err();
        assert_eq!(err, Rejection::NoPendingIn);
    }

    #[test]
    fn test_clamped_at_boundaries() {
        let mut state = state();
        state.apply(MarkCommand::SetIn { now: 0.1 }).unwrap();
        assert_eq!(state.pending_in(), Some(0.0));

        state.apply(MarkCommand::SetOut { now: 9.95 }).unwrap();
        assert_eq!(state.committed()[0].out_point, 10.0);
    }

    #[test]
    fn test_adjust_roll_floors_at_zero() {
        let mut state = state();
        for _ in 0..5 {
            state.apply(MarkCommand::AdjustPreRoll(-0.1)).unwrap();
        }
        state.apply(MarkCommand::AdjustPostRoll(0.1)).unwrap();

        let roll = state.roll();
        assert_eq!(roll.pre_roll_sec, 0.0);
        assert!(approx(roll.post_roll_sec, 0.3));
    }

    #[test]
    fn test_adjusted_roll_applies_to_next_mark() {
        let mut state = state();
        state.apply(MarkCommand::AdjustPreRoll(0.2)).unwrap();
        state.apply(MarkCommand::SetIn { now: 2.0 }).unwrap();
        assert!(approx(state.pending_in().unwrap(), 1.5));
    }

    #[test]
    fn test_export_is_a_snapshot() {
        let mut state = state();
        state.apply(MarkCommand::SetIn { now: 1.0 }).unwrap();
        state.apply(MarkCommand::SetOut { now: 2.0 }).unwrap();

        let snapshot = match state.apply(MarkCommand::Export).unwrap() {
            MarkEvent::ExportRequested(ranges) => ranges,
            other => panic!("unexpected event {other:?}"),
        };
        state.apply(MarkCommand::Undo).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert!(state.committed().is_empty());
    }

    #[test]
    fn test_roll_status_display() {
        assert_eq!(
            RollConfig::default().to_string(),
            "ROLL=ON | pre=0.30s | post=0.20s"
        );
    }

    #[test]
    fn test_zero_duration_rejected() {
        assert!(MarkState::new(0.0, RollConfig::default()).is_err());
    }
}
