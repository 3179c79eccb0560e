//! Browser events and their classification.

use serde::{Deserialize, Serialize};

use vigil_types::ViolationSignal;

pub const TAB_SWITCH_REASON: &str = "Tab Switching detected";
pub const FULLSCREEN_EXIT_REASON: &str = "Exited Fullscreen Mode";
pub const COPY_REASON: &str = "Copying content is not allowed";
pub const PASTE_REASON: &str = "Pasting content is not allowed";
pub const CONTEXT_MENU_REASON: &str = "Right-click menu is disabled";

/// A browser-level event observed by the exam page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BrowserEvent {
    /// `visibilitychange`; `hidden` mirrors `document.hidden`.
    VisibilityChange { hidden: bool },
    /// `fullscreenchange`; `active` is whether a fullscreen element exists.
    FullscreenChange { active: bool },
    Copy,
    Paste,
    ContextMenu,
}

impl BrowserEvent {
    /// The violation this event represents, ignoring arming. Returning to a
    /// visible tab or entering fullscreen is not a violation.
    pub fn classify(&self) -> Option<ViolationSignal> {
        match self {
            Self::VisibilityChange { hidden: true } => Some(ViolationSignal::hard(TAB_SWITCH_REASON)),
            Self::FullscreenChange { active: false } => {
                Some(ViolationSignal::hard(FULLSCREEN_EXIT_REASON))
            }
            Self::Copy => Some(ViolationSignal::soft(COPY_REASON)),
            Self::Paste => Some(ViolationSignal::soft(PASTE_REASON)),
            Self::ContextMenu => Some(ViolationSignal::soft(CONTEXT_MENU_REASON)),
            Self::VisibilityChange { hidden: false } | Self::FullscreenChange { active: true } => None,
        }
    }

    /// Whether the host must suppress the event's default action. Every
    /// monitored event is suppressed, independent of classification.
    pub fn prevent_default(&self) -> bool {
        true
    }
}
