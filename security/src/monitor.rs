//! Routes classified browser events to the arbiter or to the warning surface.

use std::sync::Arc;

use vigil_arbiter::{Verdict, ViolationArbiter};
use vigil_types::ViolationSignal;

use crate::BrowserEvent;

/// Where a classified event ended up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Not a violation (tab visible again, fullscreen entered).
    Ignored,
    /// Soft signal: show a transient warning, never terminal.
    Warned(ViolationSignal),
    /// Hard signal observed while unarmed; dropped.
    Discarded(ViolationSignal),
    /// Hard signal handed to the arbiter.
    Forwarded(Verdict),
}

/// Result of handling one browser event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MonitorOutcome {
    pub prevent_default: bool,
    pub disposition: Disposition,
}

/// Browser security event monitor.
pub struct SecurityMonitor {
    arbiter: Arc<ViolationArbiter>,
}

impl SecurityMonitor {
    pub fn new(arbiter: Arc<ViolationArbiter>) -> Self {
        Self { arbiter }
    }

    pub fn handle(&self, event: BrowserEvent) -> MonitorOutcome {
        let disposition = match event.classify() {
            None => Disposition::Ignored,
            Some(signal) if !signal.is_hard() => {
                tracing::warn!(reason = %signal.reason, "blocked action");
                Disposition::Warned(signal)
            }
            // The environment is unstable during fullscreen negotiation, so
            // hard events before arming are observation only.
            Some(signal) if !self.arbiter.is_armed() => {
                tracing::debug!(reason = %signal.reason, "hard event while unarmed, discarded");
                Disposition::Discarded(signal)
            }
            Some(signal) => {
                tracing::warn!(reason = %signal.reason, "hard security violation");
                Disposition::Forwarded(self.arbiter.report_violation(signal))
            }
        };

        MonitorOutcome {
            prevent_default: event.prevent_default(),
            disposition,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vigil_arbiter::{ArbiterState, AuditSink, SubmissionLatch, TerminationSink};
    use vigil_types::TerminationDecision;

    #[derive(Default)]
    struct Count(AtomicUsize);

    impl TerminationSink for Count {
        fn on_termination(&self, _decision: &TerminationDecision) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl AuditSink for Count {
        fn record(&self, _decision: &TerminationDecision) {}
    }

    fn monitor() -> (SecurityMonitor, Arc<ViolationArbiter>, Arc<Count>) {
        let count = Arc::new(Count::default());
        let arbiter = Arc::new(ViolationArbiter::new(
            Arc::new(SubmissionLatch::new()),
            Arc::clone(&count) as Arc<dyn TerminationSink>,
            Arc::clone(&count) as Arc<dyn AuditSink>,
        ));
        (SecurityMonitor::new(Arc::clone(&arbiter)), arbiter, count)
    }

    #[test]
    fn fullscreen_exit_before_arming_is_discarded() {
        let (monitor, arbiter, count) = monitor();
        let outcome = monitor.handle(BrowserEvent::FullscreenChange { active: false });
        assert!(outcome.prevent_default);
        assert!(matches!(outcome.disposition, Disposition::Discarded(_)));
        assert_eq!(arbiter.state(), ArbiterState::Unarmed);
        assert_eq!(count.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn tab_switch_while_armed_terminates() {
        let (monitor, arbiter, count) = monitor();
        arbiter.arm();
        let outcome = monitor.handle(BrowserEvent::VisibilityChange { hidden: true });
        match outcome.disposition {
            Disposition::Forwarded(Verdict::Terminate(d)) => {
                assert_eq!(d.reason, crate::TAB_SWITCH_REASON)
            }
            other => panic!("unexpected disposition {other:?}"),
        }
        assert_eq!(count.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn soft_events_warn_and_never_reach_arbiter() {
        let (monitor, arbiter, count) = monitor();
        arbiter.arm();
        for event in [BrowserEvent::Copy, BrowserEvent::Paste, BrowserEvent::ContextMenu]
            .into_iter()
            .cycle()
            .take(30)
        {
            let outcome = monitor.handle(event);
            assert!(outcome.prevent_default);
            assert!(matches!(outcome.disposition, Disposition::Warned(_)));
        }
        assert_eq!(arbiter.state(), ArbiterState::Armed);
        assert_eq!(count.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn repeated_hard_events_are_latched() {
        let (monitor, arbiter, count) = monitor();
        arbiter.arm();
        monitor.handle(BrowserEvent::VisibilityChange { hidden: true });
        let second = monitor.handle(BrowserEvent::FullscreenChange { active: false });
        // The arbiter is terminating, so it no longer counts as armed.
        assert!(matches!(second.disposition, Disposition::Discarded(_)));
        assert_eq!(count.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn returning_to_tab_is_ignored() {
        let (monitor, arbiter, _) = monitor();
        arbiter.arm();
        let outcome = monitor.handle(BrowserEvent::VisibilityChange { hidden: false });
        assert_eq!(outcome.disposition, Disposition::Ignored);
    }
}
