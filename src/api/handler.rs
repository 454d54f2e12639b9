//! API Lambda handler.
//!
//! Every invocation runs the same linear sequence:
//! - method routing (CORS preflight, POST only)
//! - body parsing and validation
//! - caller authentication according to `AUTH_MODE`
//! - prompt construction and a single completion call
//! - translation of the outcome into a proxy response
//!
//! Failures never escape as Lambda errors; each one becomes a JSON response.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use lambda_runtime::{Error, LambdaEvent};
use serde_json::Value;
use tokio::time::{Instant, timeout_at};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{auth, helpers, parsing};
use crate::core::models::{AssistantMessage, SummarizeRequest};
use crate::core::state::AppState;
use crate::errors::SummarizeError;
use crate::prompt::build_prompt;

pub use self::function_handler as handler;

/// Time kept back from the invocation deadline so the response can still be returned.
const DEADLINE_MARGIN: Duration = Duration::from_millis(500);

/// Lambda handler for the summarize endpoint.
///
/// # Errors
///
/// Never returns an error in practice; the `Result` is required by `lambda_runtime`.
pub async fn function_handler(
    state: Arc<AppState>,
    event: LambdaEvent<Value>,
) -> Result<Value, Error> {
    let remaining = remaining_time(event.context.deadline);
    Ok(handle(&state, &event.payload, remaining).await)
}

/// Processes one proxy event. `remaining` bounds the outbound calls when the host imposes a deadline.
#[tracing::instrument(level = "info", skip_all, fields(correlation_id = %Uuid::new_v4()))]
pub async fn handle(state: &AppState, payload: &Value, remaining: Option<Duration>) -> Value {
    let method = parsing::request_method(payload);

    let response = match method.as_str() {
        "OPTIONS" => helpers::no_content(),
        "POST" => match summarize(state, payload, remaining).await {
            Ok(message) => {
                info!(content_len = message.content.len(), "Summary generated");
                helpers::json_response(200, &message)
            }
            Err(e) => {
                match &e {
                    SummarizeError::MalformedRequest(_) | SummarizeError::Unauthorized(_) => {
                        warn!(kind = e.kind(), "Request rejected: {}", e);
                    }
                    _ => error!(kind = e.kind(), "Summarize failed: {}", e),
                }
                helpers::error_response(&e)
            }
        },
        other => {
            warn!(method = %other, "Unsupported method");
            helpers::method_not_allowed()
        }
    };

    helpers::with_cors(response, state.config.cors_allow_origin.as_deref())
}

async fn summarize(
    state: &AppState,
    payload: &Value,
    remaining: Option<Duration>,
) -> Result<AssistantMessage, SummarizeError> {
    let body = parsing::extract_body(payload)?;
    let request = SummarizeRequest::from_json(&body)?;
    info!(
        question_len = request.question.len(),
        has_user_id = request.user_id.is_some(),
        "Parsed summarize request"
    );

    // One deadline covers both outbound calls.
    let limit = remaining.map_or(state.config.completion_timeout, |r| {
        r.min(state.config.completion_timeout)
    });
    let deadline = Instant::now() + limit;
    let timed_out =
        || SummarizeError::UpstreamTimeout(u64::try_from(limit.as_millis()).unwrap_or(u64::MAX));

    timeout_at(
        deadline,
        auth::authorize(
            state.config.auth_mode,
            state.identity.as_deref(),
            payload.get("headers"),
            &request,
        ),
    )
    .await
    .map_err(|_| timed_out())??;

    let prompt = build_prompt(&request.question, &request.answers, state.config.prompt_style);

    timeout_at(deadline, state.completion.complete(&prompt))
        .await
        .map_err(|_| timed_out())?
}

/// Time left before `deadline_ms` (Unix epoch millis), minus a safety margin.
///
/// A zero deadline means the host did not provide one.
#[must_use]
pub fn remaining_time(deadline_ms: u64) -> Option<Duration> {
    if deadline_ms == 0 {
        return None;
    }
    let now = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
    Some(
        Duration::from_millis(deadline_ms)
            .saturating_sub(now)
            .saturating_sub(DEADLINE_MARGIN),
    )
}
