use aws_sdk_ssm::Client as SsmClient;
use tracing::info;

use super::config::AppConfig;
use crate::errors::SummarizeError;

/// Returns the completion API key, reading it from SSM when only a parameter name is configured.
///
/// # Errors
///
/// Returns `Config` if the parameter cannot be read or holds no value.
pub async fn resolve_api_key(config: &AppConfig) -> Result<String, SummarizeError> {
    if !config.openai_api_key.is_empty() {
        return Ok(config.openai_api_key.clone());
    }

    let Some(name) = &config.openai_api_key_param else {
        return Err(SummarizeError::Config(
            "OPENAI_API_KEY or OPENAI_API_KEY_PARAM must be set".to_string(),
        ));
    };

    let shared = aws_config::from_env().load().await;
    let client = SsmClient::new(&shared);

    let resp = client
        .get_parameter()
        .name(name)
        .with_decryption(true)
        .send()
        .await
        .map_err(|e| SummarizeError::Config(format!("ssm get_parameter {name}: {e}")))?;

    let value = resp
        .parameter
        .and_then(|p| p.value)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| SummarizeError::Config(format!("ssm parameter {name} is empty")))?;

    info!(parameter = %name, "Loaded completion API key from SSM");
    Ok(value)
}
