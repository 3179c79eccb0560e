//! Session identity and the status vocabulary shared with the backend.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of one exam attempt.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Server-side session status.
///
/// The backend may grow new values; anything unrecognised deserializes to
/// [`SessionStatus::Unknown`] and is treated as non-terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    Scheduled,
    Active,
    /// Soft server-side flag raised by proctors; the exam continues.
    Flagged,
    Completed,
    Terminated,
    #[serde(other)]
    Unknown,
}

impl SessionStatus {
    /// Whether the server considers the exam over.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Terminated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_is_tolerated() {
        let status: SessionStatus = serde_json::from_str("\"Paused\"").unwrap();
        assert_eq!(status, SessionStatus::Unknown);
        assert!(!status.is_terminal());
    }

    #[test]
    fn terminal_statuses() {
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Terminated.is_terminal());
        assert!(!SessionStatus::Active.is_terminal());
        assert!(!SessionStatus::Flagged.is_terminal());
        assert!(!SessionStatus::Scheduled.is_terminal());
    }

    #[test]
    fn session_id_is_transparent() {
        let id: SessionId = serde_json::from_str("\"abc-123\"").unwrap();
        assert_eq!(id.as_str(), "abc-123");
        assert_eq!(id.to_string(), "abc-123");
    }
}
