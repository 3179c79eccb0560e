//! Questions and the candidate's answers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whether a question is answered by picking an option or by typing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuestionKind {
    MultipleChoice,
    FreeText,
}

/// A single exam question. Immutable once loaded.
///
/// The backend's correct-answer field is deliberately not modelled: it is
/// dropped at deserialization and never reaches the client state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    #[serde(alias = "prompt")]
    pub text: String,
    #[serde(default)]
    pub options: Vec<String>,
}

impl Question {
    pub fn kind(&self) -> QuestionKind {
        if self.options.is_empty() {
            QuestionKind::FreeText
        } else {
            QuestionKind::MultipleChoice
        }
    }

    /// Whether `answer` has the right shape for this question.
    pub fn accepts(&self, answer: &Answer) -> bool {
        match (self.kind(), answer) {
            (QuestionKind::MultipleChoice, Answer::Choice(idx)) => *idx < self.options.len(),
            (QuestionKind::FreeText, Answer::Text(_)) => true,
            _ => false,
        }
    }
}

/// One answer: an option index or free text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Choice(usize),
    Text(String),
}

/// Question id → answer. Mutated only by direct candidate input and read
/// once at submission time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerRecord(BTreeMap<String, Answer>);

impl AnswerRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or overwrite) the answer to a question.
    pub fn set(&mut self, question_id: impl Into<String>, answer: Answer) {
        self.0.insert(question_id.into(), answer);
    }

    pub fn get(&self, question_id: &str) -> Option<&Answer> {
        self.0.get(question_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choice_question() -> Question {
        Question {
            id: "q1".into(),
            text: "2 + 2?".into(),
            options: vec!["3".into(), "4".into()],
        }
    }

    #[test]
    fn correct_answer_field_is_dropped() {
        let json = r#"{"id":"q1","text":"2 + 2?","options":["3","4"],"correct_answer":1}"#;
        let q: Question = serde_json::from_str(json).unwrap();
        assert_eq!(q, choice_question());
        assert!(!serde_json::to_string(&q).unwrap().contains("correct"));
    }

    #[test]
    fn kind_follows_options() {
        assert_eq!(choice_question().kind(), QuestionKind::MultipleChoice);
        let essay = Question {
            id: "q2".into(),
            text: "Explain.".into(),
            options: vec![],
        };
        assert_eq!(essay.kind(), QuestionKind::FreeText);
        assert!(essay.accepts(&Answer::Text("because".into())));
        assert!(!essay.accepts(&Answer::Choice(0)));
    }

    #[test]
    fn choice_out_of_range_is_rejected() {
        let q = choice_question();
        assert!(q.accepts(&Answer::Choice(1)));
        assert!(!q.accepts(&Answer::Choice(2)));
    }

    #[test]
    fn answer_record_serializes_as_map() {
        let mut record = AnswerRecord::new();
        record.set("q1", Answer::Choice(1));
        record.set("q2", Answer::Text("free".into()));
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"q1":1,"q2":"free"}"#);
        let back: AnswerRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get("q1"), Some(&Answer::Choice(1)));
        assert_eq!(back.len(), 2);
    }
}
