//! Caller authentication for the summarize endpoint.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{info, warn};

use super::parsing::get_header_value;
use crate::clients::IdentityProvider;
use crate::core::config::AuthMode;
use crate::core::models::SummarizeRequest;
use crate::errors::SummarizeError;

/// Extracts `<token>` from an `Authorization: Bearer <token>` value.
#[must_use]
pub fn parse_bearer(header: &str) -> Option<&str> {
    static BEARER_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^(?i:bearer)\s+(\S+)\s*$").expect("static regex compile"));

    BEARER_RE
        .captures(header.trim_start())
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str())
}

/// Applies the configured auth mode. Returns the verified user id, if any.
///
/// # Errors
///
/// Returns `Unauthorized` for a missing or malformed header, a token the
/// provider rejects, or (strict mode) an identity that differs from `userId`.
pub async fn authorize(
    mode: AuthMode,
    identity: Option<&dyn IdentityProvider>,
    headers: Option<&Value>,
    request: &SummarizeRequest,
) -> Result<Option<String>, SummarizeError> {
    if mode == AuthMode::None {
        return Ok(None);
    }

    let header = headers
        .and_then(|h| get_header_value(h, "Authorization"))
        .ok_or_else(|| SummarizeError::Unauthorized("Missing Authorization header".to_string()))?;

    let token = parse_bearer(header).ok_or_else(|| {
        SummarizeError::Unauthorized("Authorization header must be 'Bearer <token>'".to_string())
    })?;

    let Some(identity) = identity else {
        return Err(SummarizeError::Config(
            "identity provider is not configured".to_string(),
        ));
    };

    let user_id = identity.verify_token(token).await?;

    if mode == AuthMode::Strict && request.user_id.as_deref() != Some(user_id.as_str()) {
        warn!("Verified identity does not match the claimed userId");
        return Err(SummarizeError::Unauthorized(
            "Token does not belong to userId".to_string(),
        ));
    }

    info!(user_id = %user_id, "Caller authenticated");
    Ok(Some(user_id))
}
