use crate::core::config::PromptStyle;
use crate::core::models::{Answers, CompletionPrompt};

/// System message used by the chat strategy; the user message carries the prompt.
pub const SYSTEM_INSTRUCTION: &str = "You summarize survey answers. \
    Reply with the summary only, without preamble.";

/// Builds the summarization instruction for a question and its answers.
///
/// Pure function of its inputs: identical arguments always produce identical text.
///
/// ```
/// use summarize::core::config::PromptStyle;
/// use summarize::core::models::Answers;
/// use summarize::prompt::build_prompt;
///
/// let answers = Answers::List(vec!["sunny".into(), "rainy".into()]);
/// let prompt = build_prompt("What is the weather?", &answers, PromptStyle::Concise);
/// assert!(prompt.text.ends_with(": sunny,rainy"));
/// ```
#[must_use]
pub fn build_prompt(question: &str, answers: &Answers, style: PromptStyle) -> CompletionPrompt {
    let manner = match style {
        PromptStyle::Concise => "accurately and concisely",
        PromptStyle::Comprehensive => "accurately, comprehensively, and concisely",
    };

    CompletionPrompt {
        text: format!(
            "Describe and summarize the following list of answers to the question \"{question}\" as {manner} as possible: {}",
            answers.joined()
        ),
    }
}

#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4 + 1
}
