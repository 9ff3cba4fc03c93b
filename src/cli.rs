use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::error::Result;
use crate::settings::CutterSettings;
use crate::timecode::FrameRate;

#[derive(Debug, Parser)]
#[command(name = "cutmark")]
#[command(version)]
#[command(about = "Scene-cut timelines and hotkey highlight marking for video editing")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file (JSON). Missing file means built-in defaults.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Write the effective settings, flags included, back to the settings file
    #[arg(long, global = true)]
    pub save_config: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Detect scene cuts and write white_master.mp4, timeline.edl and segments.csv
    Timeline(TimelineArgs),
    /// Play a video and mark highlights from the keyboard, then export clips
    Mark(MarkArgs),
}

#[derive(Debug, Args)]
pub struct TimelineArgs {
    /// Input sample video
    #[arg(short, long, default_value = "input.mp4")]
    pub input: PathBuf,

    /// Scene threshold. Lower means more cuts
    #[arg(short = 't', long)]
    pub threshold: Option<f64>,

    /// Dedupe window in seconds. 0 disables merging
    #[arg(short = 'd', long)]
    pub dedupe: Option<f64>,

    /// EDL reel name, at most 8 characters
    #[arg(long)]
    pub reel: Option<String>,

    /// EDL title
    #[arg(long)]
    pub title: Option<String>,

    /// Template frame rate
    #[arg(long)]
    pub fps: Option<u32>,

    /// Directory for the generated files
    #[arg(short, long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Skip white_master.mp4 (EDL/CSV only)
    #[arg(long)]
    pub no_white: bool,
}

impl TimelineArgs {
    pub fn apply(&self, settings: &mut CutterSettings) -> Result<()> {
        let timeline = &mut settings.timeline;
        if let Some(threshold) = self.threshold {
            timeline.scene_threshold = threshold;
        }
        if let Some(window) = self.dedupe {
            timeline.dedupe_window_sec = window;
        }
        if let Some(reel) = &self.reel {
            timeline.reel = reel.clone();
        }
        if let Some(title) = &self.title {
            timeline.title = Some(title.clone());
        }
        if let Some(fps) = self.fps {
            timeline.fps = FrameRate::new(fps)?;
        }
        if self.no_white {
            timeline.render_white_master = false;
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct MarkArgs {
    /// Video to play and mark
    #[arg(short, long, default_value = "input.mp4")]
    pub input: PathBuf,

    /// Where clips and the highlight index go
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,

    /// Re-encode clips for frame-accurate cuts instead of stream copy
    #[arg(long)]
    pub reencode: bool,

    /// Run without a video window; the playhead follows wall-clock time
    #[arg(long)]
    pub headless: bool,

    /// Viewer binary
    #[arg(long, default_value = "ffplay")]
    pub ffplay: PathBuf,

    /// Pre-roll in seconds
    #[arg(long)]
    pub pre: Option<f64>,

    /// Post-roll in seconds
    #[arg(long)]
    pub post: Option<f64>,

    /// Start with roll compensation off
    #[arg(long)]
    pub no_roll: bool,
}

impl MarkArgs {
    pub fn apply(&self, settings: &mut CutterSettings) {
        if let Some(out_dir) = &self.out_dir {
            settings.export.out_dir = out_dir.clone();
        }
        if self.reencode {
            settings.export.fast_copy = false;
        }
        if let Some(pre) = self.pre {
            settings.marking.pre_roll_sec = pre.max(0.0);
        }
        if let Some(post) = self.post {
            settings.marking.post_roll_sec = post.max(0.0);
        }
        if self.no_roll {
            settings.marking.roll_enabled = false;
        }
    }
}
