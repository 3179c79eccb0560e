//! Violation signals and the write-once termination decision.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Timestamp;

/// How consequential a violation signal is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Eligible to terminate the session.
    Hard,
    /// Blocked action only; surfaced as a warning, never terminal.
    Soft,
}

/// A transient, non-persisted violation event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationSignal {
    pub reason: String,
    pub severity: Severity,
    pub at: Timestamp,
}

impl ViolationSignal {
    pub fn hard(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            severity: Severity::Hard,
            at: Timestamp::now(),
        }
    }

    pub fn soft(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            severity: Severity::Soft,
            at: Timestamp::now(),
        }
    }

    pub fn is_hard(&self) -> bool {
        self.severity == Severity::Hard
    }
}

impl fmt::Display for ViolationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Hard => "hard",
            Severity::Soft => "soft",
        };
        write!(f, "[{tag}] {}", self.reason)
    }
}

/// The one decision that ends a session. At most one exists per session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminationDecision {
    pub reason: String,
    pub timestamp: Timestamp,
}

impl TerminationDecision {
    pub fn new(reason: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            reason: reason.into(),
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_tag_severity() {
        assert!(ViolationSignal::hard("Tab Switching detected").is_hard());
        assert!(!ViolationSignal::soft("Pasting content is not allowed").is_hard());
    }

    #[test]
    fn display_includes_tag() {
        let signal = ViolationSignal::soft("Right-click menu is disabled");
        assert_eq!(signal.to_string(), "[soft] Right-click menu is disabled");
    }

    #[test]
    fn severity_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Severity::Hard).unwrap(), "\"hard\"");
    }
}
