//! Summarize - a serverless relay that summarizes a list of answers with an LLM.
//!
//! The API Lambda accepts `{ question, answers | joinedAnswers, userId? }`,
//! optionally authenticates the caller against Supabase Auth, builds a
//! summarization prompt and forwards it to an OpenAI-compatible completion
//! endpoint. The generated message is returned to the caller.
//!
//! # Architecture
//!
//! - AWS Lambda (`lambda_runtime`) for serverless execution
//! - reqwest for the completion provider and the identity provider
//! - openai-api-rs message types for the chat request shape
//! - state built once at cold start and shared across invocations
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use summarize::core::config::AppConfig;
//! use summarize::core::state::AppState;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     summarize::setup_logging();
//!
//!     let config = AppConfig::from_env()?;
//!     let state = Arc::new(AppState::initialize(config).await?);
//!
//!     let event = serde_json::json!({
//!         "httpMethod": "POST",
//!         "headers": {},
//!         "body": r#"{"question":"What is the weather?","answers":["sunny","rainy"]}"#
//!     });
//!     let response = summarize::api::handler::handle(&state, &event, None).await;
//!     println!("{}", response["body"]);
//!     Ok(())
//! }
//! ```
// Module declarations
pub mod api;
pub mod clients;
pub mod core;
pub mod errors;
pub mod prompt;

pub use errors::SummarizeError;
pub use prompt::estimate_tokens;

/// Configure structured logging with JSON format for AWS Lambda environments.
///
/// Sets up tracing-subscriber with a JSON formatter suitable for `CloudWatch`
/// Logs. The level comes from `RUST_LOG` and defaults to `info`. Safe to call
/// more than once; later calls leave the first subscriber in place.
///
/// # Example
///
/// ```
/// summarize::setup_logging();
/// ```
pub fn setup_logging() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().json().with_target(true);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
