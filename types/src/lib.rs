//! Shared data model for the vigil proctoring client.
//!
//! Every other crate in the workspace speaks in these types: session
//! identifiers and status vocabulary, questions and answers, violation
//! signals and the write-once termination decision, and the per-frame
//! face-pose signal.

pub mod pose;
pub mod question;
pub mod session;
pub mod signal;
pub mod time;

pub use pose::{FacePoseSignal, FaceStatus};
pub use question::{Answer, AnswerRecord, Question, QuestionKind};
pub use session::{SessionId, SessionStatus};
pub use signal::{Severity, TerminationDecision, ViolationSignal};
pub use time::Timestamp;
