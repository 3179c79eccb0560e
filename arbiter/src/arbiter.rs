//! The arbiter state machine: `Unarmed → Armed → Terminating → Terminated`.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

use vigil_types::{TerminationDecision, Timestamp, ViolationSignal};

use crate::SubmissionLatch;

/// Lifecycle state of the arbiter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ArbiterState {
    /// Setup phase; hard signals are observed and discarded.
    Unarmed = 0,
    /// Monitoring; the first accepted hard signal terminates.
    Armed = 1,
    /// A termination decision exists and forced submission is under way.
    Terminating = 2,
    /// Terminal. Every later signal is discarded.
    Terminated = 3,
}

impl ArbiterState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Unarmed,
            1 => Self::Armed,
            2 => Self::Terminating,
            _ => Self::Terminated,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unarmed => "unarmed",
            Self::Armed => "armed",
            Self::Terminating => "terminating",
            Self::Terminated => "terminated",
        }
    }
}

/// Receives the termination decision so forced submission can run.
pub trait TerminationSink: Send + Sync {
    fn on_termination(&self, decision: &TerminationDecision);
}

/// Best-effort, non-blocking audit trail of terminations.
pub trait AuditSink: Send + Sync {
    fn record(&self, decision: &TerminationDecision);
}

/// What the arbiter did with a reported signal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// This signal won; the session is now terminating.
    Terminate(TerminationDecision),
    /// Soft signal: advisory only.
    Advisory,
    /// Hard signal arrived before arming (or after a disarm) and was dropped.
    Unarmed,
    /// A decision or submission already exists; the signal was dropped.
    Latched,
}

/// Grace-gated, single-winner violation arbiter.
pub struct ViolationArbiter {
    state: AtomicU8,
    latch: Arc<SubmissionLatch>,
    decision: OnceLock<TerminationDecision>,
    terminations: Arc<dyn TerminationSink>,
    audit: Arc<dyn AuditSink>,
}

impl ViolationArbiter {
    pub fn new(
        latch: Arc<SubmissionLatch>,
        terminations: Arc<dyn TerminationSink>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            state: AtomicU8::new(ArbiterState::Unarmed as u8),
            latch,
            decision: OnceLock::new(),
            terminations,
            audit,
        }
    }

    pub fn state(&self) -> ArbiterState {
        ArbiterState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_armed(&self) -> bool {
        self.state() == ArbiterState::Armed
    }

    /// The winning decision, once one exists.
    pub fn decision(&self) -> Option<&TerminationDecision> {
        self.decision.get()
    }

    /// `Unarmed → Armed`. Returns whether the transition happened.
    pub fn arm(&self) -> bool {
        let armed = self.transition(ArbiterState::Unarmed, ArbiterState::Armed);
        if armed {
            tracing::info!("violation monitoring armed");
        }
        armed
    }

    /// `Armed → Unarmed`. Used right before a submission's network call so the
    /// submit flow's own fullscreen exit is not read as a violation.
    pub fn disarm(&self) -> bool {
        let disarmed = self.transition(ArbiterState::Armed, ArbiterState::Unarmed);
        if disarmed {
            tracing::debug!("violation monitoring disarmed");
        }
        disarmed
    }

    /// Move to `Terminated` from any state. Called once the forced submission
    /// has resolved, or when the session ends by another route.
    pub fn finish(&self) {
        let prev = self.state.swap(ArbiterState::Terminated as u8, Ordering::AcqRel);
        if prev != ArbiterState::Terminated as u8 {
            tracing::debug!(from = ArbiterState::from_u8(prev).as_str(), "arbiter finished");
        }
    }

    /// Judge one signal.
    pub fn report_violation(&self, signal: ViolationSignal) -> Verdict {
        if !signal.is_hard() {
            tracing::debug!(reason = %signal.reason, "advisory signal");
            return Verdict::Advisory;
        }

        match self.state() {
            ArbiterState::Unarmed => {
                tracing::debug!(reason = %signal.reason, "hard signal before arming, discarded");
                return Verdict::Unarmed;
            }
            ArbiterState::Terminating | ArbiterState::Terminated => return Verdict::Latched,
            ArbiterState::Armed => {}
        }

        // The latch is the only arbitration point; losing it means the timer,
        // a voluntary submit, or another signal already owns the session end.
        if !self.latch.try_acquire() {
            tracing::debug!(reason = %signal.reason, "submission latch already held, discarded");
            return Verdict::Latched;
        }
        self.state.store(ArbiterState::Terminating as u8, Ordering::Release);

        let decision = TerminationDecision::new(signal.reason, signal.at);
        if self.decision.set(decision.clone()).is_err() {
            return Verdict::Latched;
        }

        tracing::error!(reason = %decision.reason, at = %decision.timestamp, "session terminated by violation");
        self.audit.record(&decision);
        self.terminations.on_termination(&decision);
        Verdict::Terminate(decision)
    }

    /// Issue a decision for a terminal condition that is not a violation,
    /// such as the exam clock running out. Severity and arming do not apply,
    /// but the shared latch still does: `None` means another party already
    /// owns the session end. The termination sink is not notified because
    /// the caller performs the submission itself, and nothing is audited.
    pub fn force_terminate(&self, reason: impl Into<String>) -> Option<TerminationDecision> {
        let reason = reason.into();
        if self.state() == ArbiterState::Terminated {
            return None;
        }
        if !self.latch.try_acquire() {
            tracing::debug!(reason = %reason, "submission latch already held, forced end collapsed");
            return None;
        }
        self.state.store(ArbiterState::Terminating as u8, Ordering::Release);

        let decision = TerminationDecision::new(reason, Timestamp::now());
        if self.decision.set(decision.clone()).is_err() {
            return None;
        }
        tracing::warn!(reason = %decision.reason, at = %decision.timestamp, "session end forced");
        Some(decision)
    }

    fn transition(&self, from: ArbiterState, to: ArbiterState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        terminations: Mutex<Vec<TerminationDecision>>,
        audits: Mutex<Vec<TerminationDecision>>,
    }

    impl TerminationSink for Recorder {
        fn on_termination(&self, decision: &TerminationDecision) {
            self.terminations.lock().unwrap().push(decision.clone());
        }
    }

    impl AuditSink for Recorder {
        fn record(&self, decision: &TerminationDecision) {
            self.audits.lock().unwrap().push(decision.clone());
        }
    }

    fn arbiter() -> (ViolationArbiter, Arc<Recorder>, Arc<SubmissionLatch>) {
        let recorder = Arc::new(Recorder::default());
        let latch = Arc::new(SubmissionLatch::new());
        let arbiter = ViolationArbiter::new(
            Arc::clone(&latch),
            Arc::clone(&recorder) as Arc<dyn TerminationSink>,
            Arc::clone(&recorder) as Arc<dyn AuditSink>,
        );
        (arbiter, recorder, latch)
    }

    #[test]
    fn starts_unarmed() {
        let (arbiter, _, _) = arbiter();
        assert_eq!(arbiter.state(), ArbiterState::Unarmed);
        assert!(arbiter.decision().is_none());
    }

    #[test]
    fn hard_signal_before_arming_is_discarded() {
        let (arbiter, recorder, latch) = arbiter();
        let verdict = arbiter.report_violation(ViolationSignal::hard("Exited Fullscreen Mode"));
        assert_eq!(verdict, Verdict::Unarmed);
        assert_eq!(arbiter.state(), ArbiterState::Unarmed);
        assert!(!latch.is_held());
        assert!(recorder.terminations.lock().unwrap().is_empty());
    }

    #[test]
    fn first_hard_signal_wins() {
        let (arbiter, recorder, latch) = arbiter();
        assert!(arbiter.arm());

        let first = arbiter.report_violation(ViolationSignal::hard("Tab Switching detected"));
        let second = arbiter.report_violation(ViolationSignal::hard("Exited Fullscreen Mode"));

        assert!(matches!(first, Verdict::Terminate(ref d) if d.reason == "Tab Switching detected"));
        assert_eq!(second, Verdict::Latched);
        assert_eq!(arbiter.state(), ArbiterState::Terminating);
        assert!(latch.is_held());
        assert_eq!(arbiter.decision().unwrap().reason, "Tab Switching detected");
        assert_eq!(recorder.terminations.lock().unwrap().len(), 1);
        assert_eq!(recorder.audits.lock().unwrap().len(), 1);
    }

    #[test]
    fn soft_signals_never_terminate() {
        let (arbiter, recorder, _) = arbiter();
        arbiter.arm();
        for _ in 0..50 {
            assert_eq!(
                arbiter.report_violation(ViolationSignal::soft("Copying content is not allowed")),
                Verdict::Advisory
            );
        }
        assert_eq!(arbiter.state(), ArbiterState::Armed);
        assert!(recorder.terminations.lock().unwrap().is_empty());
    }

    #[test]
    fn latch_held_elsewhere_blocks_termination() {
        let (arbiter, recorder, latch) = arbiter();
        arbiter.arm();
        assert!(latch.try_acquire());
        assert_eq!(
            arbiter.report_violation(ViolationSignal::hard("Tab Switching detected")),
            Verdict::Latched
        );
        assert_eq!(arbiter.state(), ArbiterState::Armed);
        assert!(arbiter.decision().is_none());
        assert!(recorder.terminations.lock().unwrap().is_empty());
    }

    #[test]
    fn disarm_suppresses_hard_signals() {
        let (arbiter, _, _) = arbiter();
        arbiter.arm();
        assert!(arbiter.disarm());
        assert_eq!(
            arbiter.report_violation(ViolationSignal::hard("Exited Fullscreen Mode")),
            Verdict::Unarmed
        );
    }

    #[test]
    fn cannot_rearm_after_termination() {
        let (arbiter, _, _) = arbiter();
        arbiter.arm();
        arbiter.report_violation(ViolationSignal::hard("No face detected"));
        assert!(!arbiter.arm());
        assert!(!arbiter.disarm());
        arbiter.finish();
        assert_eq!(arbiter.state(), ArbiterState::Terminated);
        assert!(!arbiter.arm());
    }

    #[test]
    fn forced_end_bypasses_arming_and_wins_once() {
        let (arbiter, recorder, latch) = arbiter();
        let decision = arbiter.force_terminate("Time Expired").unwrap();
        assert_eq!(decision.reason, "Time Expired");
        assert_eq!(arbiter.state(), ArbiterState::Terminating);
        assert!(latch.is_held());
        assert_eq!(arbiter.decision(), Some(&decision));

        assert!(arbiter.force_terminate("Time Expired").is_none());
        arbiter.arm();
        assert_eq!(
            arbiter.report_violation(ViolationSignal::hard("Tab Switching detected")),
            Verdict::Latched
        );
        assert!(recorder.terminations.lock().unwrap().is_empty());
        assert!(recorder.audits.lock().unwrap().is_empty());
    }

    #[test]
    fn forced_end_loses_to_a_held_latch() {
        let (arbiter, _, latch) = arbiter();
        assert!(latch.try_acquire());
        assert!(arbiter.force_terminate("Time Expired").is_none());
        assert!(arbiter.decision().is_none());
        assert_eq!(arbiter.state(), ArbiterState::Unarmed);
    }

    #[test]
    fn finish_from_unarmed_discards_later_signals() {
        let (arbiter, recorder, _) = arbiter();
        arbiter.finish();
        assert!(!arbiter.arm());
        assert_eq!(
            arbiter.report_violation(ViolationSignal::hard("Tab Switching detected")),
            Verdict::Latched
        );
        assert!(recorder.terminations.lock().unwrap().is_empty());
    }
}
