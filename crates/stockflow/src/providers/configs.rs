use anyhow::{anyhow, Result};

use super::capabilities::ProviderKind;
use crate::config::{to_env_var, ProviderCredentials};

pub const OPENAI_HOST: &str = "https://api.openai.com";
pub const ANTHROPIC_HOST: &str = "https://api.anthropic.com";
pub const GOOGLE_HOST: &str = "https://generativelanguage.googleapis.com";
pub const ANTHROPIC_MAX_TOKENS: i32 = 8192;

// Unified enum to wrap different provider configurations
#[derive(Debug, Clone)]
pub enum ProviderConfig {
    OpenAi(OpenAiProviderConfig),
    Anthropic(AnthropicProviderConfig),
    Google(GoogleProviderConfig),
}

#[derive(Debug, Clone)]
pub struct OpenAiProviderConfig {
    pub host: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct AnthropicProviderConfig {
    pub host: String,
    pub api_key: String,
    pub max_tokens: i32,
}

#[derive(Debug, Clone)]
pub struct GoogleProviderConfig {
    pub host: String,
    pub api_key: String,
}

impl ProviderConfig {
    /// Pick the transport configuration for a provider family out of the credentials
    pub fn from_credentials(kind: ProviderKind, credentials: &ProviderCredentials) -> Result<Self> {
        match kind {
            ProviderKind::OpenAi => Ok(ProviderConfig::OpenAi(OpenAiProviderConfig {
                host: host_or(&credentials.openai_host, OPENAI_HOST),
                api_key: require_key(&credentials.openai_api_key, "credentials.openai_api_key")?,
            })),
            ProviderKind::Claude => Ok(ProviderConfig::Anthropic(AnthropicProviderConfig {
                host: host_or(&credentials.anthropic_host, ANTHROPIC_HOST),
                api_key: require_key(
                    &credentials.anthropic_api_key,
                    "credentials.anthropic_api_key",
                )?,
                max_tokens: ANTHROPIC_MAX_TOKENS,
            })),
            ProviderKind::Gemini => Ok(ProviderConfig::Google(GoogleProviderConfig {
                host: host_or(&credentials.google_host, GOOGLE_HOST),
                api_key: require_key(&credentials.google_api_key, "credentials.google_api_key")?,
            })),
        }
    }
}

fn host_or(host: &Option<String>, default: &str) -> String {
    host.clone().unwrap_or_else(|| default.to_string())
}

fn require_key(key: &Option<String>, field: &str) -> Result<String> {
    key.as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(String::from)
        .ok_or_else(|| anyhow!("API key must be set via {}", to_env_var(field)))
}
