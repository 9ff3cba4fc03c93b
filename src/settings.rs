use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::export::files::write_atomic;
use crate::marks::{Keymap, RollConfig};
use crate::media::ExtractMode;
use crate::segmentation::SegmentationConfig;
use crate::timecode::FrameRate;

pub const DEFAULT_SETTINGS_FILE: &str = "cutmark.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineSettings {
    pub scene_threshold: f64,
    pub dedupe_window_sec: f64,
    pub fps: FrameRate,
    pub reel: String,
    /// Falls back to `WHITE_TEMPLATE_<fps>FPS` when unset.
    pub title: Option<String>,
    pub render_white_master: bool,
}

impl Default for TimelineSettings {
    fn default() -> Self {
        let segmentation = SegmentationConfig::default();
        Self {
            scene_threshold: segmentation.scene_threshold,
            dedupe_window_sec: segmentation.dedupe_window_sec,
            fps: FrameRate::FPS_30,
            reel: "WHITE".into(),
            title: None,
            render_white_master: true,
        }
    }
}

impl TimelineSettings {
    pub fn segmentation(&self) -> SegmentationConfig {
        SegmentationConfig {
            scene_threshold: self.scene_threshold,
            dedupe_window_sec: self.dedupe_window_sec,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkingSettings {
    pub roll_enabled: bool,
    pub pre_roll_sec: f64,
    pub post_roll_sec: f64,
    /// Increment used by the roll tuning keys.
    pub step_sec: f64,
    pub queue_capacity: usize,
    pub poll_interval_ms: u64,
}

impl Default for MarkingSettings {
    fn default() -> Self {
        let roll = RollConfig::default();
        Self {
            roll_enabled: roll.enabled,
            pre_roll_sec: roll.pre_roll_sec,
            post_roll_sec: roll.post_roll_sec,
            step_sec: 0.10,
            queue_capacity: 64,
            poll_interval_ms: 200,
        }
    }
}

impl MarkingSettings {
    pub fn roll(&self) -> RollConfig {
        RollConfig::new(self.roll_enabled, self.pre_roll_sec, self.post_roll_sec)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub out_dir: PathBuf,
    pub fast_copy: bool,
    pub max_parallel: usize,
    pub fps: FrameRate,
    pub reel: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("highlights"),
            fast_copy: true,
            max_parallel: 2,
            fps: FrameRate::FPS_30,
            reel: "HILITE".into(),
        }
    }
}

impl ExportSettings {
    pub fn mode(&self) -> ExtractMode {
        if self.fast_copy {
            ExtractMode::FastCopy
        } else {
            ExtractMode::Reencode
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CutterSettings {
    pub timeline: TimelineSettings,
    pub marking: MarkingSettings,
    pub export: ExportSettings,
    pub keymap: Keymap,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<CutterSettings>,
}

impl SettingsStore {
    /// Missing file means defaults. A file that does not parse also means
    /// defaults, with a warning, so a typo never blocks a session.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            match serde_json::from_str(&contents) {
                Ok(settings) => settings,
                Err(err) => {
                    log::warn!(
                        "Ignoring unreadable settings at {}: {err}; using defaults",
                        path.display()
                    );
                    CutterSettings::default()
                }
            }
        } else {
            CutterSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current(&self) -> CutterSettings {
        self.read().clone()
    }

    /// Replace the cached settings and write them out.
    pub fn save(&self, settings: CutterSettings) -> Result<()> {
        let mut guard = self.write();
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    fn persist(&self, data: &CutterSettings) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        write_atomic(&self.path, &serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, CutterSettings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, CutterSettings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marks::MarkAction;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("absent.json")).unwrap();
        let settings = store.current();
        assert_eq!(settings, CutterSettings::default());
        assert_eq!(settings.timeline.reel, "WHITE");
        assert_eq!(settings.export.reel, "HILITE");
        assert_eq!(settings.marking.queue_capacity, 64);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cutmark.json");
        fs::write(
            &path,
            r#"{ "timeline": { "fps": 25 }, "keymap": { "space": "in" } }"#,
        )
        .unwrap();

        let settings = SettingsStore::new(path).unwrap().current();
        assert_eq!(settings.timeline.fps.get(), 25);
        assert_eq!(settings.timeline.dedupe_window_sec, 0.05);
        assert_eq!(settings.keymap.lookup("space"), Some(MarkAction::In));
        assert_eq!(settings.keymap.lookup("i"), None);
    }

    #[test]
    fn test_bad_json_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cutmark.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(
            SettingsStore::new(path).unwrap().current(),
            CutterSettings::default()
        );
    }

    #[test]
    fn test_zero_fps_rejected_as_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cutmark.json");
        fs::write(&path, r#"{ "export": { "fps": 0 } }"#).unwrap();
        assert_eq!(
            SettingsStore::new(path).unwrap().current().export.fps,
            FrameRate::FPS_30
        );
    }

    #[test]
    fn test_save_then_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cutmark.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        let mut settings = store.current();
        settings.marking.pre_roll_sec = 0.5;
        settings.export.fast_copy = false;
        store.save(settings).unwrap();
        assert_eq!(store.current().marking.pre_roll_sec, 0.5);

        let reopened = SettingsStore::new(path).unwrap().current();
        assert_eq!(reopened.marking.pre_roll_sec, 0.5);
        assert_eq!(reopened.export.mode(), ExtractMode::Reencode);
    }
}
