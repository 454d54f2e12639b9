use serde::{Deserialize, Serialize};

use crate::errors::SummarizeError;

/// Answers as sent by the caller: either a list or a string the caller already joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answers {
    List(Vec<String>),
    Joined(String),
}

impl Answers {
    /// Renders the collection the way it is interpolated into the prompt.
    #[must_use]
    pub fn joined(&self) -> String {
        match self {
            Answers::List(items) => items.join(","),
            Answers::Joined(text) => text.clone(),
        }
    }
}

/// `answers` on the wire: a list, or a string the caller already joined.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAnswers {
    List(Vec<String>),
    Joined(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSummarizeRequest {
    question: Option<String>,
    answers: Option<RawAnswers>,
    joined_answers: Option<String>,
    user_id: Option<String>,
}

/// Validated summarization request parsed from the inbound body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummarizeRequest {
    pub question: String,
    pub answers: Answers,
    pub user_id: Option<String>,
}

impl SummarizeRequest {
    /// Parses and validates a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `MalformedRequest` when the body is not JSON, `question` is missing
    /// or blank, or neither `answers` nor `joinedAnswers` carries any content.
    pub fn from_json(body: &str) -> Result<Self, SummarizeError> {
        if body.trim().is_empty() {
            return Err(SummarizeError::MalformedRequest("Empty body".to_string()));
        }
        let raw: RawSummarizeRequest = serde_json::from_str(body)?;

        let question = raw
            .question
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| SummarizeError::MalformedRequest("question is required".to_string()))?;

        let answers = match (raw.answers, raw.joined_answers) {
            (Some(RawAnswers::List(list)), _) if !list.is_empty() => Answers::List(list),
            (Some(RawAnswers::Joined(joined)), _) if !joined.trim().is_empty() => {
                Answers::Joined(joined)
            }
            (_, Some(joined)) if !joined.trim().is_empty() => Answers::Joined(joined),
            _ => {
                return Err(SummarizeError::MalformedRequest(
                    "answers or joinedAnswers is required".to_string(),
                ));
            }
        };

        Ok(Self {
            question,
            answers,
            user_id: raw.user_id.filter(|u| !u.trim().is_empty()),
        })
    }
}

/// Instruction string sent to the completion provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompletionPrompt {
    pub text: String,
}

/// Generated message returned to the caller on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantMessage {
    pub role: String,
    pub content: String,
}

impl AssistantMessage {
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}
