//! The collaborator contract and its payload shapes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use vigil_types::{AnswerRecord, Question, SessionId, SessionStatus, Timestamp};

use crate::ClientError;

/// Session as returned by `fetch_session_by_id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub status: SessionStatus,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub answers: AnswerRecord,
    #[serde(default, alias = "examTitle")]
    pub exam_title: String,
    #[serde(default)]
    pub question_paper_id: Option<String>,
    #[serde(default)]
    pub termination_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuestionPaper {
    pub title: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub score: f64,
    pub total: u32,
    pub percentage: f64,
}

/// Out-of-band status from the periodic poll.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: SessionStatus,
    #[serde(default)]
    pub termination_reason: Option<String>,
    #[serde(default)]
    pub latest_message: Option<String>,
    #[serde(default)]
    pub is_message_read: bool,
}

impl StatusReport {
    /// The proctor message still waiting for the candidate, if any.
    pub fn unread_message(&self) -> Option<&str> {
        match &self.latest_message {
            Some(m) if !self.is_message_read && !m.trim().is_empty() => Some(m.as_str()),
            _ => None,
        }
    }
}

#[async_trait]
pub trait ExamBackend: Send + Sync {
    async fn fetch_session_by_id(&self, id: &SessionId) -> Result<SessionRecord, ClientError>;

    async fn fetch_question_paper(&self, paper_id: &str) -> Result<QuestionPaper, ClientError>;

    /// Server-side idempotency is assumed but never relied on: callers make
    /// this call at most once per session.
    async fn submit_answers(
        &self,
        id: &SessionId,
        answers: &AnswerRecord,
    ) -> Result<SubmissionResult, ClientError>;

    /// Fire-and-forget audit entry. Duplicates are tolerated by the backend.
    async fn log_violation(
        &self,
        id: &SessionId,
        message: &str,
        timestamp: Timestamp,
    ) -> Result<(), ClientError>;

    async fn poll_session_status(&self, id: &SessionId) -> Result<StatusReport, ClientError>;

    async fn acknowledge_message(&self, id: &SessionId) -> Result<(), ClientError>;
}
