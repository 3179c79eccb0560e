//! Session lifecycle states and the events a host renders.

use serde::{Deserialize, Serialize};

use vigil_client::SubmissionResult;
use vigil_types::FacePoseSignal;

pub const TIME_EXPIRED_REASON: &str = "Time Expired";
pub const SERVER_TERMINATED_REASON: &str = "Terminated by proctor";

/// Exam page lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Loading,
    AwaitingFullscreen,
    Running,
    Submitting,
    Completed,
    Terminated,
}

impl LifecycleState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Terminated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::AwaitingFullscreen => "awaiting_fullscreen",
            Self::Running => "running",
            Self::Submitting => "submitting",
            Self::Completed => "completed",
            Self::Terminated => "terminated",
        }
    }
}

/// What ended the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndedBy {
    Candidate,
    TimeExpired,
    Violation,
    /// Reported by the backend, at load or through the status poll.
    Server,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionOutcome {
    /// Always [`LifecycleState::Completed`] or [`LifecycleState::Terminated`].
    pub state: LifecycleState,
    pub ended_by: EndedBy,
    pub reason: Option<String>,
    /// Present when the final submission call succeeded.
    pub result: Option<SubmissionResult>,
}

/// Everything a host renders, in emission order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum SessionEvent {
    StateChanged(LifecycleState),
    Tick { remaining_secs: u64, display: String },
    /// Soft violation; the host shows it for `display_secs` then hides it.
    Warning { reason: String, display_secs: u64 },
    FaceStatus(FacePoseSignal),
    ProctorMessage(String),
    MonitoringDegraded(String),
    /// Fullscreen request refused; the session stays in `AwaitingFullscreen`.
    FullscreenRejected(String),
    SubmitFailed(String),
    Finished(SessionOutcome),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_completed_and_terminated_are_terminal() {
        let terminal: Vec<_> = [
            LifecycleState::Loading,
            LifecycleState::AwaitingFullscreen,
            LifecycleState::Running,
            LifecycleState::Submitting,
            LifecycleState::Completed,
            LifecycleState::Terminated,
        ]
        .into_iter()
        .filter(LifecycleState::is_terminal)
        .collect();
        assert_eq!(terminal, vec![LifecycleState::Completed, LifecycleState::Terminated]);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(SessionEvent::Warning {
            reason: "Pasting content is not allowed".into(),
            display_secs: 3,
        })
        .unwrap();
        assert_eq!(json["type"], "warning");
        assert_eq!(json["data"]["display_secs"], 3);

        let json = serde_json::to_value(SessionEvent::StateChanged(LifecycleState::Running)).unwrap();
        assert_eq!(json["data"], "RUNNING");

        let json = serde_json::to_value(SessionEvent::ProctorMessage("Face the camera".into())).unwrap();
        assert_eq!(json["type"], "proctor_message");
    }
}
