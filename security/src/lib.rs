//! Browser security event monitor.
//!
//! Classifies the browser-level events a proctored page listens for:
//!
//! | Event                          | Severity | Reason                            |
//! |--------------------------------|----------|-----------------------------------|
//! | document hidden                | hard     | "Tab Switching detected"          |
//! | fullscreen exited while armed  | hard     | "Exited Fullscreen Mode"          |
//! | copy                           | soft     | "Copying content is not allowed"  |
//! | paste                          | soft     | "Pasting content is not allowed"  |
//! | context menu                   | soft     | "Right-click menu is disabled"    |
//!
//! All five have their default action suppressed. Hard signals reach the
//! arbiter only while it is armed; soft ones never do.

pub mod event;
pub mod monitor;

pub use event::{
    BrowserEvent, CONTEXT_MENU_REASON, COPY_REASON, FULLSCREEN_EXIT_REASON, PASTE_REASON,
    TAB_SWITCH_REASON,
};
pub use monitor::{Disposition, MonitorOutcome, SecurityMonitor};
