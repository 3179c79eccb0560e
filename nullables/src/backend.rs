//! Nullable backend: scripted responses, recorded calls.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use vigil_client::{
    ClientError, ExamBackend, QuestionPaper, SessionRecord, StatusReport, SubmissionResult,
};
use vigil_types::{AnswerRecord, Question, SessionId, SessionStatus, Timestamp};

/// An in-memory exam backend.
///
/// Status polls and submissions pop scripted outcomes in order; once the
/// script runs out, polls report `Active` and submissions succeed.
pub struct NullBackend {
    session: Mutex<Option<SessionRecord>>,
    papers: Mutex<HashMap<String, QuestionPaper>>,
    statuses: Mutex<VecDeque<Result<StatusReport, String>>>,
    submit_outcomes: Mutex<VecDeque<Result<SubmissionResult, String>>>,
    submissions: Mutex<Vec<(SessionId, AnswerRecord)>>,
    violations: Mutex<Vec<(SessionId, String, Timestamp)>>,
    polls: AtomicUsize,
    acks: AtomicUsize,
}

impl NullBackend {
    /// A backend serving one active session with the given questions.
    pub fn active(questions: Vec<Question>) -> Self {
        Self::with_session(SessionRecord {
            status: SessionStatus::Active,
            questions,
            answers: AnswerRecord::new(),
            exam_title: "Null Exam".into(),
            question_paper_id: None,
            termination_reason: None,
        })
    }

    pub fn with_session(record: SessionRecord) -> Self {
        Self {
            session: Mutex::new(Some(record)),
            papers: Mutex::new(HashMap::new()),
            statuses: Mutex::new(VecDeque::new()),
            submit_outcomes: Mutex::new(VecDeque::new()),
            submissions: Mutex::new(Vec::new()),
            violations: Mutex::new(Vec::new()),
            polls: AtomicUsize::new(0),
            acks: AtomicUsize::new(0),
        }
    }

    /// A backend that knows no sessions at all.
    pub fn empty() -> Self {
        let backend = Self::active(Vec::new());
        *backend.session.lock().unwrap() = None;
        backend
    }

    pub fn add_paper(&self, id: &str, paper: QuestionPaper) {
        self.papers.lock().unwrap().insert(id.to_string(), paper);
    }

    /// Script the next status-poll response.
    pub fn push_status(&self, report: StatusReport) {
        self.statuses.lock().unwrap().push_back(Ok(report));
    }

    /// Script the next status poll to fail.
    pub fn fail_next_poll(&self) {
        self.statuses
            .lock()
            .unwrap()
            .push_back(Err("poll unavailable".into()));
    }

    /// Script the next submission to fail.
    pub fn fail_next_submit(&self) {
        self.submit_outcomes
            .lock()
            .unwrap()
            .push_back(Err("submit unavailable".into()));
    }

    /// All recorded submissions (for assertions).
    pub fn submissions(&self) -> Vec<(SessionId, AnswerRecord)> {
        self.submissions.lock().unwrap().clone()
    }

    /// All recorded audit-log entries (for assertions).
    pub fn violations(&self) -> Vec<(SessionId, String, Timestamp)> {
        self.violations.lock().unwrap().clone()
    }

    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn ack_count(&self) -> usize {
        self.acks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExamBackend for NullBackend {
    async fn fetch_session_by_id(&self, id: &SessionId) -> Result<SessionRecord, ClientError> {
        self.session
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ClientError::NotFound(format!("session {id}")))
    }

    async fn fetch_question_paper(&self, paper_id: &str) -> Result<QuestionPaper, ClientError> {
        self.papers
            .lock()
            .unwrap()
            .get(paper_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("question paper {paper_id}")))
    }

    async fn submit_answers(
        &self,
        id: &SessionId,
        answers: &AnswerRecord,
    ) -> Result<SubmissionResult, ClientError> {
        self.submissions
            .lock()
            .unwrap()
            .push((id.clone(), answers.clone()));
        match self.submit_outcomes.lock().unwrap().pop_front() {
            Some(Err(e)) => Err(ClientError::RequestFailed(e)),
            Some(Ok(result)) => Ok(result),
            None => Ok(SubmissionResult {
                score: answers.len() as f64,
                total: answers.len() as u32,
                percentage: 100.0,
            }),
        }
    }

    async fn log_violation(
        &self,
        id: &SessionId,
        message: &str,
        timestamp: Timestamp,
    ) -> Result<(), ClientError> {
        self.violations
            .lock()
            .unwrap()
            .push((id.clone(), message.to_string(), timestamp));
        Ok(())
    }

    async fn poll_session_status(&self, _id: &SessionId) -> Result<StatusReport, ClientError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        match self.statuses.lock().unwrap().pop_front() {
            Some(Err(e)) => Err(ClientError::Unreachable(e)),
            Some(Ok(report)) => Ok(report),
            None => Ok(StatusReport {
                status: SessionStatus::Active,
                termination_reason: None,
                latest_message: None,
                is_message_read: true,
            }),
        }
    }

    async fn acknowledge_message(&self, _id: &SessionId) -> Result<(), ClientError> {
        self.acks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
