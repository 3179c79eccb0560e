//! Exam backend collaborator.
//!
//! The proctoring core talks to the backend only through [`ExamBackend`]:
//! - `fetch_session_by_id` / `fetch_question_paper` on load
//! - `submit_answers` exactly once per session
//! - `log_violation` fire-and-forget audit trail
//! - `poll_session_status` / `acknowledge_message` for the admin side-channel
//!
//! [`HttpExamBackend`] is the JSON-over-HTTP implementation.

pub mod backend;
pub mod error;
pub mod http;

pub use backend::{ExamBackend, QuestionPaper, SessionRecord, StatusReport, SubmissionResult};
pub use error::ClientError;
pub use http::HttpExamBackend;
