//! Identity provider (Supabase Auth) used to resolve bearer tokens.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::warn;
use url::Url;

use crate::errors::SummarizeError;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolves a bearer token to the user identifier it was issued for.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` when the provider rejects the token and
    /// `UpstreamFailure` when the provider cannot be reached.
    async fn verify_token(&self, token: &str) -> Result<String, SummarizeError>;
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
}

/// Client handle for a Supabase project. Built once per process and shared.
pub struct SupabaseAuth {
    http: Client,
    user_endpoint: Url,
    anon_key: String,
    timeout_ms: u64,
}

impl SupabaseAuth {
    /// # Errors
    ///
    /// Returns `Config` if the user endpoint cannot be derived from `project_url`
    /// or the HTTP client cannot be constructed.
    pub fn new(
        project_url: &Url,
        anon_key: String,
        timeout: Duration,
    ) -> Result<Self, SummarizeError> {
        let user_endpoint = project_url
            .join("auth/v1/user")
            .map_err(|e| SummarizeError::Config(format!("SUPABASE_URL: {e}")))?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SummarizeError::Config(format!("http client: {e}")))?;

        Ok(Self {
            http,
            user_endpoint,
            anon_key,
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        })
    }
}

#[async_trait]
impl IdentityProvider for SupabaseAuth {
    async fn verify_token(&self, token: &str) -> Result<String, SummarizeError> {
        let response = self
            .http
            .get(self.user_endpoint.clone())
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SummarizeError::UpstreamTimeout(self.timeout_ms)
                } else {
                    SummarizeError::from(e)
                }
            })?;

        match response.status() {
            status if status.is_success() => {
                let user: AuthUser = response.json().await?;
                Ok(user.id)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(SummarizeError::Unauthorized(
                "Invalid token".to_string(),
            )),
            status => {
                warn!(status = status.as_u16(), "Identity provider returned an error status");
                Err(SummarizeError::UpstreamFailure(format!(
                    "identity provider status {}",
                    status.as_u16()
                )))
            }
        }
    }
}
