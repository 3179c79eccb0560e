//! Arbiter sinks wired to the lifecycle controller and the backend.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;

use vigil_arbiter::{AuditSink, TerminationSink};
use vigil_client::ExamBackend;
use vigil_types::{SessionId, TerminationDecision};

use crate::controller::Command;

/// Hands the decision to the controller loop, which owns forced submission.
pub(crate) struct ControllerSink {
    commands: mpsc::UnboundedSender<Command>,
}

impl ControllerSink {
    pub(crate) fn new(commands: mpsc::UnboundedSender<Command>) -> Self {
        Self { commands }
    }
}

impl TerminationSink for ControllerSink {
    fn on_termination(&self, decision: &TerminationDecision) {
        if self.commands.send(Command::Terminate(decision.clone())).is_err() {
            tracing::warn!(reason = %decision.reason, "controller gone, termination not delivered");
        }
    }
}

/// Writes one `logViolation` entry per termination without blocking the
/// caller. Failures are logged and swallowed.
pub(crate) struct BackendAuditSink {
    backend: Arc<dyn ExamBackend>,
    session_id: SessionId,
    runtime: Handle,
}

impl BackendAuditSink {
    pub(crate) fn new(backend: Arc<dyn ExamBackend>, session_id: SessionId, runtime: Handle) -> Self {
        Self {
            backend,
            session_id,
            runtime,
        }
    }
}

impl AuditSink for BackendAuditSink {
    fn record(&self, decision: &TerminationDecision) {
        let backend = Arc::clone(&self.backend);
        let session_id = self.session_id.clone();
        let decision = decision.clone();
        self.runtime.spawn(async move {
            if let Err(e) = backend
                .log_violation(&session_id, &decision.reason, decision.timestamp)
                .await
            {
                tracing::warn!(session = %session_id, error = %e, "failed to record violation");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vigil_nullables::NullBackend;
    use vigil_types::Timestamp;

    #[tokio::test]
    async fn controller_sink_forwards_decision() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = ControllerSink::new(tx);
        let decision = TerminationDecision::new("Tab Switching detected", Timestamp::from_millis(7));
        sink.on_termination(&decision);
        match rx.recv().await {
            Some(Command::Terminate(d)) => assert_eq!(d, decision),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[tokio::test]
    async fn controller_sink_tolerates_closed_channel() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let sink = ControllerSink::new(tx);
        sink.on_termination(&TerminationDecision::new("x", Timestamp::EPOCH));
    }

    #[tokio::test]
    async fn audit_sink_logs_once_in_background() {
        let backend = Arc::new(NullBackend::active(Vec::new()));
        let sink = BackendAuditSink::new(
            Arc::clone(&backend) as Arc<dyn ExamBackend>,
            SessionId::new("s-1"),
            Handle::current(),
        );
        sink.record(&TerminationDecision::new(
            "Exited Fullscreen Mode",
            Timestamp::from_millis(99),
        ));
        tokio::time::sleep(Duration::from_millis(20)).await;

        let logged = backend.violations();
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].1, "Exited Fullscreen Mode");
        assert_eq!(logged[0].2, Timestamp::from_millis(99));
    }
}
