use thiserror::Error;

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Completion provider failed: {0}")]
    UpstreamFailure(String),

    #[error("Completion provider timed out after {0} ms")]
    UpstreamTimeout(u64),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl SummarizeError {
    /// HTTP status returned to the caller for this failure.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            SummarizeError::MalformedRequest(_) => 400,
            SummarizeError::Unauthorized(_) => 401,
            SummarizeError::UpstreamFailure(_)
            | SummarizeError::UpstreamTimeout(_)
            | SummarizeError::Config(_) => 500,
        }
    }

    /// Stable error kind written to the `error` field of the response body.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            SummarizeError::MalformedRequest(_) => "MalformedRequest",
            SummarizeError::Unauthorized(_) => "Unauthorized",
            SummarizeError::UpstreamFailure(_) => "UpstreamFailure",
            SummarizeError::UpstreamTimeout(_) => "UpstreamTimeout",
            SummarizeError::Config(_) => "Config",
        }
    }
}

impl From<reqwest::Error> for SummarizeError {
    fn from(error: reqwest::Error) -> Self {
        // Strip the URL so query strings never end up in a response body.
        SummarizeError::UpstreamFailure(error.without_url().to_string())
    }
}

impl From<serde_json::Error> for SummarizeError {
    fn from(error: serde_json::Error) -> Self {
        SummarizeError::MalformedRequest(format!("Invalid JSON: {error}"))
    }
}
