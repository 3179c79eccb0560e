//! Host ⇄ daemon wire format: one JSON object per line.

use serde::{Deserialize, Serialize};

use vigil_face::LandmarkResult;
use vigil_security::BrowserEvent;
use vigil_types::{Answer, FacePoseSignal};

/// A message from the host page, read from stdin.
#[derive(Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMessage {
    FullscreenEntered,
    FullscreenFailed { error: String },
    /// `{"type":"browser","event":"visibility_change","hidden":true}`
    Browser(BrowserEvent),
    /// Raw face-mesh output from a model running in the host.
    Landmarks(LandmarkResult),
    /// A pose signal the host already classified.
    FaceSignal(FacePoseSignal),
    Answer { question_id: String, answer: Answer },
    Submit,
    AckMessage,
    /// Page exit.
    Leave,
}

/// Direct replies to host messages, written to stdout between session events.
#[derive(Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum HostReply {
    /// Whether the host must cancel the browser event's default action.
    PreventDefault(bool),
    /// The message was malformed or could not be applied.
    Error(String),
}

pub fn parse_line(line: &str) -> Result<HostMessage, serde_json::Error> {
    serde_json::from_str(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_browser_events_inline() {
        assert_eq!(
            parse_line(r#"{"type":"browser","event":"visibility_change","hidden":true}"#).unwrap(),
            HostMessage::Browser(BrowserEvent::VisibilityChange { hidden: true })
        );
        assert_eq!(
            parse_line(r#"{"type":"browser","event":"paste"}"#).unwrap(),
            HostMessage::Browser(BrowserEvent::Paste)
        );
    }

    #[test]
    fn parses_answers_of_both_shapes() {
        assert_eq!(
            parse_line(r#"{"type":"answer","question_id":"q1","answer":2}"#).unwrap(),
            HostMessage::Answer {
                question_id: "q1".into(),
                answer: Answer::Choice(2)
            }
        );
        assert_eq!(
            parse_line(r#"{"type":"answer","question_id":"q2","answer":"because"}"#).unwrap(),
            HostMessage::Answer {
                question_id: "q2".into(),
                answer: Answer::Text("because".into())
            }
        );
    }

    #[test]
    fn parses_landmark_payload() {
        let msg = parse_line(r#"{"type":"landmarks","multiFaceLandmarks":[]}"#).unwrap();
        assert_eq!(msg, HostMessage::Landmarks(LandmarkResult::empty()));
    }

    #[test]
    fn parses_unit_messages() {
        assert_eq!(parse_line(r#"{"type":"submit"}"#).unwrap(), HostMessage::Submit);
        assert_eq!(parse_line(r#"{"type":"ack_message"}"#).unwrap(), HostMessage::AckMessage);
        assert_eq!(
            parse_line(r#"{"type":"fullscreen_failed","error":"denied"}"#).unwrap(),
            HostMessage::FullscreenFailed {
                error: "denied".into()
            }
        );
    }

    #[test]
    fn rejects_unknown_types() {
        assert!(parse_line(r#"{"type":"teleport"}"#).is_err());
        assert!(parse_line("not json").is_err());
    }

    #[test]
    fn replies_are_tagged() {
        let json = serde_json::to_string(&HostReply::PreventDefault(true)).unwrap();
        assert_eq!(json, r#"{"type":"prevent_default","data":true}"#);
    }
}
