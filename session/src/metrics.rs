//! Prometheus metrics for a proctoring session.
//!
//! [`ProctorMetrics`] owns a dedicated [`Registry`] so a host can scrape one
//! session without picking up anything else in the process.

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, IntCounter,
    IntGauge, Opts, Registry, TextEncoder,
};

use vigil_arbiter::Verdict;

use crate::SessionError;

pub struct ProctorMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Hard signals observed from any source, accepted or not.
    pub hard_signals: IntCounter,
    /// Soft signals surfaced as transient warnings.
    pub soft_warnings: IntCounter,
    /// Hard signals dropped because monitoring was unarmed or already latched.
    pub discarded_signals: IntCounter,
    /// Sessions ended by a violation.
    pub terminations: IntCounter,
    /// Submission calls made (voluntary, timed or forced).
    pub submissions: IntCounter,
    pub submission_failures: IntCounter,
    pub poll_failures: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    pub time_remaining_seconds: IntGauge,
}

impl ProctorMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let hard_signals = register_int_counter_with_registry!(
            Opts::new("vigil_hard_signals_total", "Hard violation signals observed"),
            registry
        )
        .expect("failed to register hard_signals counter");

        let soft_warnings = register_int_counter_with_registry!(
            Opts::new("vigil_soft_warnings_total", "Soft violations shown as warnings"),
            registry
        )
        .expect("failed to register soft_warnings counter");

        let discarded_signals = register_int_counter_with_registry!(
            Opts::new(
                "vigil_discarded_signals_total",
                "Hard signals discarded while unarmed or latched"
            ),
            registry
        )
        .expect("failed to register discarded_signals counter");

        let terminations = register_int_counter_with_registry!(
            Opts::new("vigil_terminations_total", "Sessions terminated by a violation"),
            registry
        )
        .expect("failed to register terminations counter");

        let submissions = register_int_counter_with_registry!(
            Opts::new("vigil_submissions_total", "Answer submission calls made"),
            registry
        )
        .expect("failed to register submissions counter");

        let submission_failures = register_int_counter_with_registry!(
            Opts::new(
                "vigil_submission_failures_total",
                "Answer submission calls that failed"
            ),
            registry
        )
        .expect("failed to register submission_failures counter");

        let poll_failures = register_int_counter_with_registry!(
            Opts::new("vigil_poll_failures_total", "Status polls that failed"),
            registry
        )
        .expect("failed to register poll_failures counter");

        let time_remaining_seconds = register_int_gauge_with_registry!(
            Opts::new("vigil_time_remaining_seconds", "Seconds left on the exam countdown"),
            registry
        )
        .expect("failed to register time_remaining_seconds gauge");

        Self {
            registry,
            hard_signals,
            soft_warnings,
            discarded_signals,
            terminations,
            submissions,
            submission_failures,
            poll_failures,
            time_remaining_seconds,
        }
    }

    /// Account for one arbiter verdict.
    pub fn observe_verdict(&self, verdict: &Verdict) {
        match verdict {
            Verdict::Advisory => self.soft_warnings.inc(),
            Verdict::Terminate(_) => {
                self.hard_signals.inc();
                self.terminations.inc();
            }
            Verdict::Unarmed | Verdict::Latched => {
                self.hard_signals.inc();
                self.discarded_signals.inc();
            }
        }
    }

    /// Render the registry in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, SessionError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| SessionError::Other(format!("metrics encoding failed: {e}")))?;
        String::from_utf8(buffer).map_err(|e| SessionError::Other(e.to_string()))
    }
}

impl Default for ProctorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_types::{TerminationDecision, Timestamp};

    #[test]
    fn metrics_start_at_zero() {
        let m = ProctorMetrics::new();
        assert_eq!(m.hard_signals.get(), 0);
        assert_eq!(m.submissions.get(), 0);
        assert_eq!(m.time_remaining_seconds.get(), 0);
    }

    #[test]
    fn verdicts_feed_the_right_counters() {
        let m = ProctorMetrics::new();
        m.observe_verdict(&Verdict::Advisory);
        m.observe_verdict(&Verdict::Unarmed);
        m.observe_verdict(&Verdict::Latched);
        m.observe_verdict(&Verdict::Terminate(TerminationDecision::new(
            "Exited Fullscreen Mode",
            Timestamp::from_millis(1),
        )));
        assert_eq!(m.soft_warnings.get(), 1);
        assert_eq!(m.hard_signals.get(), 3);
        assert_eq!(m.discarded_signals.get(), 2);
        assert_eq!(m.terminations.get(), 1);
    }

    #[test]
    fn encode_lists_every_metric() {
        let m = ProctorMetrics::new();
        m.submissions.inc();
        m.time_remaining_seconds.set(42);
        let text = m.encode().unwrap();
        assert!(text.contains("vigil_submissions_total 1"));
        assert!(text.contains("vigil_time_remaining_seconds 42"));
        assert!(text.contains("vigil_poll_failures_total 0"));
    }
}
