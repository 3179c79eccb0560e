//! JSON-over-HTTP implementation of [`ExamBackend`].

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use vigil_types::{AnswerRecord, SessionId, Timestamp};

use crate::backend::{ExamBackend, QuestionPaper, SessionRecord, StatusReport, SubmissionResult};
use crate::ClientError;

/// Default timeout for backend requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for the exam backend's REST API, rooted at `{base_url}/api`.
pub struct HttpExamBackend {
    base_url: String,
    /// HTTP client (reusable connection pool).
    http_client: reqwest::Client,
}

#[derive(Serialize)]
struct SubmitBody<'a> {
    answers: &'a AnswerRecord,
}

#[derive(Serialize)]
struct ViolationBody<'a> {
    message: &'a str,
    timestamp: Timestamp,
}

impl HttpExamBackend {
    pub fn new(base_url: &str) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<T, ClientError> {
        let response = self
            .http_client
            .get(self.url(path))
            .send()
            .await
            .map_err(map_send_error)?;
        decode(check_status(response, what)?).await
    }

    async fn post<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        what: &str,
    ) -> Result<reqwest::Response, ClientError> {
        let response = self
            .http_client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(map_send_error)?;
        check_status(response, what)
    }
}

fn map_send_error(e: reqwest::Error) -> ClientError {
    if e.is_timeout() {
        ClientError::Unreachable(format!("request timed out: {e}"))
    } else if e.is_connect() {
        ClientError::Unreachable(format!("connection failed: {e}"))
    } else {
        ClientError::RequestFailed(e.to_string())
    }
}

fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(ClientError::NotFound(what.to_string()));
    }
    if !status.is_success() {
        return Err(ClientError::RequestFailed(format!("HTTP status {status}")));
    }
    Ok(response)
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    response
        .json()
        .await
        .map_err(|e| ClientError::InvalidResponse(format!("failed to parse response: {e}")))
}

#[async_trait]
impl ExamBackend for HttpExamBackend {
    async fn fetch_session_by_id(&self, id: &SessionId) -> Result<SessionRecord, ClientError> {
        self.get_json(&format!("sessions/{id}"), &format!("session {id}"))
            .await
    }

    async fn fetch_question_paper(&self, paper_id: &str) -> Result<QuestionPaper, ClientError> {
        self.get_json(
            &format!("question-papers/{paper_id}"),
            &format!("question paper {paper_id}"),
        )
        .await
    }

    async fn submit_answers(
        &self,
        id: &SessionId,
        answers: &AnswerRecord,
    ) -> Result<SubmissionResult, ClientError> {
        let response = self
            .post(
                &format!("sessions/{id}/submit"),
                &SubmitBody { answers },
                &format!("session {id}"),
            )
            .await?;
        decode(response).await
    }

    async fn log_violation(
        &self,
        id: &SessionId,
        message: &str,
        timestamp: Timestamp,
    ) -> Result<(), ClientError> {
        self.post(
            &format!("sessions/{id}/violations"),
            &ViolationBody { message, timestamp },
            &format!("session {id}"),
        )
        .await?;
        Ok(())
    }

    async fn poll_session_status(&self, id: &SessionId) -> Result<StatusReport, ClientError> {
        self.get_json(&format!("sessions/{id}/status"), &format!("session {id}"))
            .await
    }

    async fn acknowledge_message(&self, id: &SessionId) -> Result<(), ClientError> {
        self.post(
            &format!("sessions/{id}/message/ack"),
            &serde_json::json!({}),
            &format!("session {id}"),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slashes() {
        let backend = HttpExamBackend::new("http://exam.local:8000/");
        assert_eq!(
            backend.url("/sessions/abc/status"),
            "http://exam.local:8000/api/sessions/abc/status"
        );
    }

    #[test]
    fn violation_body_shape() {
        let body = ViolationBody {
            message: "Tab Switching detected",
            timestamp: Timestamp::from_millis(1_700_000_000_000),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["message"], "Tab Switching detected");
        assert_eq!(json["timestamp"], 1_700_000_000_000u64);
    }

    #[tokio::test]
    async fn refused_connection_is_unreachable() {
        let backend = HttpExamBackend::with_timeout("http://127.0.0.1:1", Duration::from_secs(2));
        let err = backend
            .poll_session_status(&SessionId::new("s1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Unreachable(_)), "got {err:?}");
    }
}
