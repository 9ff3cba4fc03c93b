use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{CutError, Result};
use crate::media::{BlankMaster, ClipRequest, ExtractMode, Prober, SceneDetector, Transcoder};
use crate::models::VideoInfo;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// ffmpeg/ffprobe invoked as child processes.
#[derive(Debug, Clone)]
pub struct FfmpegTools {
    ffmpeg_bin: PathBuf,
    ffprobe_bin: PathBuf,
}

impl Default for FfmpegTools {
    fn default() -> Self {
        Self {
            ffmpeg_bin: PathBuf::from("ffmpeg"),
            ffprobe_bin: PathBuf::from("ffprobe"),
        }
    }
}

impl FfmpegTools {
    pub fn new(ffmpeg_bin: impl Into<PathBuf>, ffprobe_bin: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_bin: ffmpeg_bin.into(),
            ffprobe_bin: ffprobe_bin.into(),
        }
    }

    /// Fail early when either binary cannot be run.
    pub fn require_tools(&self) -> Result<()> {
        for bin in [&self.ffmpeg_bin, &self.ffprobe_bin] {
            let output = run(Command::new(bin).arg("-version"), bin)?;
            if !output.status.success() {
                return Err(CutError::tool(
                    tool_name(bin),
                    format!(
                        "'{} -version' exited with {}; install FFmpeg and make sure it is on PATH",
                        bin.display(),
                        output.status
                    ),
                ));
            }
        }
        Ok(())
    }
}

fn tool_name(bin: &Path) -> String {
    bin.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| bin.display().to_string())
}

fn run(command: &mut Command, bin: &Path) -> Result<Output> {
    command
        .output()
        .map_err(|err| CutError::tool(tool_name(bin), format!("could not start: {err}")))
}

fn stderr_tail(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let lines: Vec<&str> = stderr.lines().collect();
    let start = lines.len().saturating_sub(20);
    lines[start..].join("\n")
}

fn pts_time_regex() -> Result<&'static Regex> {
    static RE: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"pts_time:([0-9]+\.[0-9]+)"))
        .as_ref()
        .map_err(|err| CutError::tool("ffmpeg", format!("bad pts_time pattern: {err}")))
}

/// Pull `pts_time:` values out of ffmpeg `showinfo` log output.
pub fn parse_scene_times(log: &str) -> Result<Vec<f64>> {
    let pattern = pts_time_regex()?;
    Ok(log
        .lines()
        .filter_map(|line| pattern.captures(line))
        .filter_map(|caps| caps.get(1)?.as_str().parse::<f64>().ok())
        .collect())
}

/// Parse `ffprobe -of default=nw=1` key/value output.
pub fn parse_probe_output(stdout: &str) -> Result<VideoInfo> {
    let info: HashMap<&str, &str> = stdout
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim(), v.trim()))
        .collect();

    let field = |key: &str| {
        info.get(key).copied().ok_or_else(|| {
            CutError::validation(format!(
                "ffprobe did not report {key} (need width, height and duration)"
            ))
        })
    };
    let malformed =
        |key: &str, value: &str| CutError::validation(format!("ffprobe {key} '{value}' is malformed"));

    let width_raw = field("width")?;
    let height_raw = field("height")?;
    let duration_raw = field("duration")?;

    let width = width_raw
        .parse::<u32>()
        .map_err(|_| malformed("width", width_raw))?;
    let height = height_raw
        .parse::<u32>()
        .map_err(|_| malformed("height", height_raw))?;
    let duration = duration_raw
        .parse::<f64>()
        .map_err(|_| malformed("duration", duration_raw))?;

    VideoInfo::new(width, height, duration)
}

impl Prober for FfmpegTools {
    fn probe(&self, input: &Path) -> Result<VideoInfo> {
        let output = run(
            Command::new(&self.ffprobe_bin)
                .args(["-v", "error", "-select_streams", "v:0"])
                .args(["-show_entries", "stream=width,height:format=duration"])
                .args(["-of", "default=nw=1"])
                .arg(input),
            &self.ffprobe_bin,
        )?;
        if !output.status.success() {
            return Err(CutError::tool(
                tool_name(&self.ffprobe_bin),
                format!("could not read {}: {}", input.display(), stderr_tail(&output)),
            ));
        }
        parse_probe_output(&String::from_utf8_lossy(&output.stdout))
    }
}

impl SceneDetector for FfmpegTools {
    fn detect_cuts(&self, input: &Path, threshold: f64) -> Result<Vec<f64>> {
        let filter = format!("select='gt(scene,{threshold})',showinfo");
        log_info!("Detecting scene cuts in {} (threshold {threshold})", input.display());

        let output = run(
            Command::new(&self.ffmpeg_bin)
                .args(["-hide_banner", "-i"])
                .arg(input)
                .args(["-vf", filter.as_str(), "-f", "null", "-"]),
            &self.ffmpeg_bin,
        )?;
        if !output.status.success() {
            return Err(CutError::tool(
                tool_name(&self.ffmpeg_bin),
                format!("scene detection failed: {}", stderr_tail(&output)),
            ));
        }

        // showinfo logs to stderr
        parse_scene_times(&String::from_utf8_lossy(&output.stderr))
    }
}

impl Transcoder for FfmpegTools {
    fn extract_clip(&self, request: &ClipRequest) -> Result<()> {
        let start = format!("{:.3}", request.start);
        let end = format!("{:.3}", request.end);
        let codec_args: &[&str] = match request.mode {
            ExtractMode::FastCopy => &["-c", "copy"],
            ExtractMode::Reencode => &["-c:v", "libx264", "-c:a", "aac"],
        };

        let mut command = Command::new(&self.ffmpeg_bin);
        command
            .args(["-y", "-ss", start.as_str(), "-to", end.as_str(), "-i"])
            .arg(&request.input)
            .args(codec_args)
            .arg(&request.output);

        let output = run(&mut command, &self.ffmpeg_bin)?;
        if !output.status.success() {
            log_warn!(
                "ffmpeg exited with {} for {}",
                output.status,
                request.output.display()
            );
            return Err(CutError::tool(
                tool_name(&self.ffmpeg_bin),
                stderr_tail(&output),
            ));
        }
        Ok(())
    }

    fn render_blank_master(&self, master: &BlankMaster) -> Result<()> {
        let source = format!(
            "color=c=white:s={}x{}:r={}",
            master.info.width,
            master.info.height,
            master.fps.get()
        );
        let duration = format!("{:.3}", master.info.duration_secs);

        let output = run(
            Command::new(&self.ffmpeg_bin)
                .args(["-y", "-f", "lavfi", "-i", source.as_str(), "-t", duration.as_str()])
                .args(["-c:v", "libx264", "-pix_fmt", "yuv420p"])
                .arg(&master.output),
            &self.ffmpeg_bin,
        )?;
        if !output.status.success() {
            return Err(CutError::tool(
                tool_name(&self.ffmpeg_bin),
                format!("white master render failed:\n{}", stderr_tail(&output)),
            ));
        }
        Ok(())
    }
}
