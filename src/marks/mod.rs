pub mod commands;
pub mod controller;
pub mod keymap;
pub mod state;

pub use controller::{ExportContext, MarkController, SessionSummary};
pub use keymap::{Keymap, MarkAction};
pub use state::{MarkCommand, MarkEvent, MarkState, Rejection, RollConfig};
