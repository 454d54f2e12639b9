use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LEGACY_MODEL: &str = "text-curie-001";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_TIMEOUT_SECS: u64 = 25;

/// How callers are authenticated before the completion call is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Relay every well-formed request.
    None,
    /// Require `Authorization: Bearer <token>` and verify it with the identity provider.
    Bearer,
    /// As `Bearer`, and the verified identity must equal the body's `userId`.
    Strict,
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "off" => Ok(AuthMode::None),
            "bearer" => Ok(AuthMode::Bearer),
            "strict" => Ok(AuthMode::Strict),
            other => Err(format!("unknown auth mode '{other}'")),
        }
    }
}

/// Request shape used to talk to the completion provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionShape {
    /// `POST /completions` with a single `prompt` string.
    Legacy,
    /// `POST /chat/completions` with `system` + `user` messages.
    Chat,
}

impl FromStr for CompletionShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "legacy" | "completion" => Ok(CompletionShape::Legacy),
            "chat" => Ok(CompletionShape::Chat),
            other => Err(format!("unknown completion shape '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStyle {
    Concise,
    Comprehensive,
}

impl FromStr for PromptStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "concise" => Ok(PromptStyle::Concise),
            "comprehensive" => Ok(PromptStyle::Comprehensive),
            other => Err(format!("unknown prompt style '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            max_tokens: 100,
            top_p: 1.0,
            frequency_penalty: 0.5,
            presence_penalty: 0.0,
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub openai_api_key: String,
    /// SSM parameter to read the key from when `openai_api_key` is empty.
    pub openai_api_key_param: Option<String>,
    pub openai_org_id: Option<String>,
    pub openai_base_url: Url,
    pub openai_model: String,
    pub completion_shape: CompletionShape,
    pub generation: GenerationParams,
    pub completion_timeout: Duration,
    pub prompt_style: PromptStyle,
    pub auth_mode: AuthMode,
    pub supabase_url: Option<Url>,
    pub supabase_anon_key: Option<String>,
    pub cors_allow_origin: Option<String>,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("openai_api_key", &"<redacted>")
            .field("openai_api_key_param", &self.openai_api_key_param)
            .field("openai_org_id", &self.openai_org_id)
            .field("openai_base_url", &self.openai_base_url.as_str())
            .field("openai_model", &self.openai_model)
            .field("completion_shape", &self.completion_shape)
            .field("generation", &self.generation)
            .field("completion_timeout", &self.completion_timeout)
            .field("prompt_style", &self.prompt_style)
            .field("auth_mode", &self.auth_mode)
            .field("supabase_url", &self.supabase_url.as_ref().map(Url::as_str))
            .field(
                "supabase_anon_key",
                &self.supabase_anon_key.as_ref().map(|_| "<redacted>"),
            )
            .field("cors_allow_origin", &self.cors_allow_origin)
            .finish()
    }
}

impl AppConfig {
    /// # Errors
    ///
    /// Returns the name of the first missing or unparseable variable.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable lookup. Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns the name of the first missing or unparseable variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let openai_api_key = get("OPENAI_API_KEY").unwrap_or_default();
        let openai_api_key_param = get("OPENAI_API_KEY_PARAM");
        if openai_api_key.is_empty() && openai_api_key_param.is_none() {
            return Err("OPENAI_API_KEY: environment variable not found".to_string());
        }

        let completion_shape = parse_or(
            get("COMPLETION_SHAPE"),
            "COMPLETION_SHAPE",
            CompletionShape::Legacy,
        )?;
        let default_model = match completion_shape {
            CompletionShape::Legacy => DEFAULT_LEGACY_MODEL,
            CompletionShape::Chat => DEFAULT_CHAT_MODEL,
        };

        let defaults = GenerationParams::default();
        let generation = GenerationParams {
            temperature: parse_finite(
                get("COMPLETION_TEMPERATURE"),
                "COMPLETION_TEMPERATURE",
                defaults.temperature,
            )?,
            max_tokens: parse_or(
                get("COMPLETION_MAX_TOKENS"),
                "COMPLETION_MAX_TOKENS",
                defaults.max_tokens,
            )?,
            top_p: parse_finite(get("COMPLETION_TOP_P"), "COMPLETION_TOP_P", defaults.top_p)?,
            frequency_penalty: parse_finite(
                get("COMPLETION_FREQUENCY_PENALTY"),
                "COMPLETION_FREQUENCY_PENALTY",
                defaults.frequency_penalty,
            )?,
            presence_penalty: parse_finite(
                get("COMPLETION_PRESENCE_PENALTY"),
                "COMPLETION_PRESENCE_PENALTY",
                defaults.presence_penalty,
            )?,
        };

        let timeout_secs: u64 = parse_or(
            get("COMPLETION_TIMEOUT_SECS"),
            "COMPLETION_TIMEOUT_SECS",
            DEFAULT_TIMEOUT_SECS,
        )?;
        if timeout_secs == 0 {
            return Err("COMPLETION_TIMEOUT_SECS: must be greater than zero".to_string());
        }

        let auth_mode = parse_or(get("AUTH_MODE"), "AUTH_MODE", AuthMode::None)?;
        let supabase_url = get("SUPABASE_URL")
            .map(|raw| parse_url(&raw, "SUPABASE_URL"))
            .transpose()?;
        let supabase_anon_key = get("SUPABASE_ANON_KEY");
        if auth_mode != AuthMode::None {
            if supabase_url.is_none() {
                return Err("SUPABASE_URL: required when AUTH_MODE is enabled".to_string());
            }
            if supabase_anon_key.is_none() {
                return Err("SUPABASE_ANON_KEY: required when AUTH_MODE is enabled".to_string());
            }
        }

        Ok(Self {
            openai_api_key,
            openai_api_key_param,
            openai_org_id: get("OPENAI_ORG_ID"),
            openai_base_url: parse_url(
                &get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
                "OPENAI_BASE_URL",
            )?,
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| default_model.to_string()),
            completion_shape,
            generation,
            completion_timeout: Duration::from_secs(timeout_secs),
            prompt_style: parse_or(get("PROMPT_STYLE"), "PROMPT_STYLE", PromptStyle::Concise)?,
            auth_mode,
            supabase_url,
            supabase_anon_key,
            cors_allow_origin: get("CORS_ALLOW_ORIGIN"),
        })
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T, String>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match raw {
        Some(v) => v.trim().parse::<T>().map_err(|e| format!("{key}: {e}")),
        None => Ok(default),
    }
}

/// Like `parse_or`, but rejects `NaN` and infinities, which serialize as JSON `null`.
fn parse_finite(raw: Option<String>, key: &str, default: f32) -> Result<f32, String> {
    let value: f32 = parse_or(raw, key, default)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("{key}: must be a finite number"))
    }
}

fn parse_url(raw: &str, key: &str) -> Result<Url, String> {
    let mut url = Url::parse(raw.trim()).map_err(|e| format!("{key}: {e}"))?;
    // Keep a trailing slash so `join` appends rather than replaces the last segment.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
