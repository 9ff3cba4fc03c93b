use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// What a key press asks for, before the playhead is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkAction {
    In,
    Out,
    Undo,
    Print,
    Export,
    Quit,
    ToggleRoll,
    PreRollDown,
    PreRollUp,
    PostRollDown,
    PostRollUp,
}

/// Key → action table. Keys are matched against a whole trimmed input line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Keymap(BTreeMap<String, MarkAction>);

impl Default for Keymap {
    fn default() -> Self {
        let bindings = [
            ("i", MarkAction::In),
            ("o", MarkAction::Out),
            ("u", MarkAction::Undo),
            ("p", MarkAction::Print),
            ("e", MarkAction::Export),
            ("q", MarkAction::Quit),
            ("ctrl+q", MarkAction::Quit),
            // DC1, what a raw terminal delivers for Ctrl+Q
            ("\u{11}", MarkAction::Quit),
            ("r", MarkAction::ToggleRoll),
            ("[", MarkAction::PreRollDown),
            ("]", MarkAction::PreRollUp),
            ("-", MarkAction::PostRollDown),
            ("=", MarkAction::PostRollUp),
        ];
        Self(
            bindings
                .into_iter()
                .map(|(key, action)| (key.to_string(), action))
                .collect(),
        )
    }
}

impl Keymap {
    pub fn lookup(&self, input: &str) -> Option<MarkAction> {
        let key = input.trim();
        self.0
            .get(key)
            .or_else(|| self.0.get(&key.to_ascii_lowercase()))
            .copied()
    }

    pub fn bind(&mut self, key: impl Into<String>, action: MarkAction) {
        self.0.insert(key.into(), action);
    }

    /// Keys bound to `action`, for the help banner.
    pub fn keys_for(&self, action: MarkAction) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(key, bound)| **bound == action && key.chars().all(|c| !c.is_control()))
            .map(|(key, _)| key.as_str())
            .collect()
    }
}
