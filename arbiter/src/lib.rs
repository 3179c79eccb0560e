//! Violation arbiter: the single authority that decides when a session ends.
//!
//! Signals from the face pipeline and the browser security monitor arrive
//! here in arbitrary order. The arbiter:
//! - ignores everything until it is armed (grace period after fullscreen entry)
//! - never lets a soft signal terminate
//! - lets exactly one hard signal win, via a [`SubmissionLatch`] shared with
//!   the lifecycle controller's timer and voluntary-submit paths
//! - records the winning reason once, then notifies its sinks
//! - issues the same single decision for a forced end such as time expiry,
//!   without consulting severity or arming

pub mod arbiter;
pub mod latch;

pub use arbiter::{ArbiterState, AuditSink, TerminationSink, Verdict, ViolationArbiter};
pub use latch::SubmissionLatch;
