use std::sync::Arc;

use tracing::info;

use super::config::{AppConfig, AuthMode};
use super::secrets::resolve_api_key;
use crate::clients::{CompletionBackend, IdentityProvider, LlmClient, SupabaseAuth};
use crate::errors::SummarizeError;

/// Read-only state shared by every invocation of the process.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub completion: Arc<dyn CompletionBackend>,
    /// Present only when `config.auth_mode` is not `AuthMode::None`.
    pub identity: Option<Arc<dyn IdentityProvider>>,
}

impl AppState {
    /// Wires the production collaborators. Called once at cold start.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the API key cannot be resolved or a client cannot be built.
    pub async fn initialize(config: AppConfig) -> Result<Self, SummarizeError> {
        let api_key = resolve_api_key(&config).await?;
        let completion: Arc<dyn CompletionBackend> = Arc::new(LlmClient::new(&config, api_key)?);

        let identity: Option<Arc<dyn IdentityProvider>> = match config.auth_mode {
            AuthMode::None => None,
            AuthMode::Bearer | AuthMode::Strict => {
                let (Some(url), Some(anon_key)) =
                    (&config.supabase_url, &config.supabase_anon_key)
                else {
                    return Err(SummarizeError::Config(
                        "SUPABASE_URL and SUPABASE_ANON_KEY are required for authenticated mode"
                            .to_string(),
                    ));
                };
                let auth: Arc<dyn IdentityProvider> = Arc::new(SupabaseAuth::new(
                    url,
                    anon_key.clone(),
                    config.completion_timeout,
                )?);
                Some(auth)
            }
        };

        info!(
            auth_mode = ?config.auth_mode,
            completion_shape = ?config.completion_shape,
            model = %config.openai_model,
            "Summarize state initialized"
        );

        Ok(Self::with_clients(config, completion, identity))
    }

    /// Assembles state from already-built collaborators.
    #[must_use]
    pub fn with_clients(
        config: AppConfig,
        completion: Arc<dyn CompletionBackend>,
        identity: Option<Arc<dyn IdentityProvider>>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            completion,
            identity,
        }
    }
}
