//! Shared observable state: lifecycle watch, event broadcast, final outcome.

use std::sync::{Arc, OnceLock};

use tokio::sync::{broadcast, watch};

use crate::events::{LifecycleState, SessionEvent, SessionOutcome};
use crate::ProctorMetrics;

const EVENT_CAPACITY: usize = 256;

pub(crate) struct SessionSurface {
    state: watch::Sender<LifecycleState>,
    events: broadcast::Sender<SessionEvent>,
    outcome: OnceLock<SessionOutcome>,
    pub(crate) metrics: Arc<ProctorMetrics>,
}

impl SessionSurface {
    pub(crate) fn new(metrics: Arc<ProctorMetrics>) -> Self {
        let (state, _) = watch::channel(LifecycleState::Loading);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state,
            events,
            outcome: OnceLock::new(),
            metrics,
        }
    }

    pub(crate) fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    pub(crate) fn watch_state(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub(crate) fn outcome(&self) -> Option<&SessionOutcome> {
        self.outcome.get()
    }

    /// Broadcast to current subscribers. Having none is fine.
    pub(crate) fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    pub(crate) fn set_state(&self, next: LifecycleState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            tracing::info!(from = prev.as_str(), to = next.as_str(), "session state changed");
            self.emit(SessionEvent::StateChanged(next));
        }
    }

    /// Record the final outcome and enter its terminal state. Only the first
    /// call has any effect.
    pub(crate) fn finish(&self, outcome: SessionOutcome) {
        if self.outcome.set(outcome.clone()).is_err() {
            tracing::warn!("session already finished, outcome ignored");
            return;
        }
        tracing::info!(
            state = outcome.state.as_str(),
            ended_by = ?outcome.ended_by,
            reason = outcome.reason.as_deref().unwrap_or("-"),
            "session finished"
        );
        self.set_state(outcome.state);
        self.emit(SessionEvent::Finished(outcome));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EndedBy;

    fn outcome(state: LifecycleState) -> SessionOutcome {
        SessionOutcome {
            state,
            ended_by: EndedBy::Candidate,
            reason: None,
            result: None,
        }
    }

    #[tokio::test]
    async fn state_changes_are_broadcast_once() {
        let surface = SessionSurface::new(Arc::new(ProctorMetrics::new()));
        let mut rx = surface.subscribe();
        surface.set_state(LifecycleState::AwaitingFullscreen);
        surface.set_state(LifecycleState::AwaitingFullscreen);
        surface.set_state(LifecycleState::Running);

        assert_eq!(
            rx.recv().await.unwrap(),
            SessionEvent::StateChanged(LifecycleState::AwaitingFullscreen)
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            SessionEvent::StateChanged(LifecycleState::Running)
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn first_outcome_wins() {
        let surface = SessionSurface::new(Arc::new(ProctorMetrics::new()));
        surface.finish(outcome(LifecycleState::Completed));
        surface.finish(outcome(LifecycleState::Terminated));
        assert_eq!(surface.state(), LifecycleState::Completed);
        assert_eq!(surface.outcome().unwrap().state, LifecycleState::Completed);
    }
}
