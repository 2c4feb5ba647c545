use config::{Config, Environment};
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

use crate::prompt_template::{
    DEFAULT_ASSISTANT_PROMPT, DEFAULT_BACKGROUND_PROMPT, DEFAULT_FEEDBACK_PROMPT,
    DEFAULT_PROBLEM_STATEMENT_PROMPT, DEFAULT_SYSTEM_PROMPT, MENTOR_SYSTEM_PROMPT,
};

pub const DEFAULT_MODEL: &str = "gpt-4.1";
pub const ENV_PREFIX: &str = "STOCKFLOW";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable: {env_var}")]
    MissingEnvVar { env_var: String },

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Map a config key like `credentials.openai_api_key` to its env var name
pub fn to_env_var(field: &str) -> String {
    format!("{}_{}", ENV_PREFIX, field.to_uppercase().replace('.', "__"))
}

/// API keys and host overrides handed to the provider transports
#[derive(Clone, Default, Deserialize)]
pub struct ProviderCredentials {
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub anthropic_api_key: Option<String>,
    #[serde(default)]
    pub google_api_key: Option<String>,
    #[serde(default)]
    pub openai_host: Option<String>,
    #[serde(default)]
    pub anthropic_host: Option<String>,
    #[serde(default)]
    pub google_host: Option<String>,
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redact(key: &Option<String>) -> &'static str {
            if key.is_some() {
                "<redacted>"
            } else {
                "<unset>"
            }
        }

        f.debug_struct("ProviderCredentials")
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("anthropic_api_key", &redact(&self.anthropic_api_key))
            .field("google_api_key", &redact(&self.google_api_key))
            .field("openai_host", &self.openai_host)
            .field("anthropic_host", &self.anthropic_host)
            .field("google_host", &self.google_host)
            .finish()
    }
}

/// Everything one `generate` call needs to know.
///
/// Built once and read by reference; mentor mode is a plain field resolved when the
/// conversation is built.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub mentor_mode: bool,
    #[serde(default = "default_model")]
    pub underlying_model: String,
    #[serde(default)]
    pub background_knowledge: Option<String>,
    #[serde(default)]
    pub problem_statement: Option<String>,
    /// Overrides both the default and the mentor system prompt
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Sent verbatim after a prior model, skipped when blank
    #[serde(default = "default_assistant_prompt")]
    pub assistant_prompt: String,
    /// Sent verbatim as the last user message
    #[serde(default = "default_feedback_prompt")]
    pub feedback_prompt: String,
    /// Tera template rendered with `{{ background_knowledge }}`, which is
    /// appended when the template does not reference it. Literal `{{` or
    /// `{%` must be escaped with `{% raw %}`.
    #[serde(default = "default_background_prompt")]
    pub background_prompt: String,
    /// Tera template rendered with `{{ problem_statement }}`, appended when
    /// the template does not reference it.
    #[serde(default = "default_problem_statement_prompt")]
    pub problem_statement_prompt: String,
    #[serde(default)]
    pub credentials: ProviderCredentials,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mentor_mode: false,
            underlying_model: default_model(),
            background_knowledge: None,
            problem_statement: None,
            system_prompt: None,
            assistant_prompt: default_assistant_prompt(),
            feedback_prompt: default_feedback_prompt(),
            background_prompt: default_background_prompt(),
            problem_statement_prompt: default_problem_statement_prompt(),
            credentials: ProviderCredentials::default(),
        }
    }
}

impl EngineConfig {
    pub fn new<S: Into<String>>(underlying_model: S) -> Self {
        Self {
            underlying_model: underlying_model.into(),
            ..Default::default()
        }
    }

    /// Load defaults overlaid with `STOCKFLOW_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("underlying_model", default_model())?
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        match config.try_deserialize::<Self>() {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);
                if let config::ConfigError::NotFound(field) = &err {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }

    pub fn with_mentor_mode(mut self, mentor_mode: bool) -> Self {
        self.mentor_mode = mentor_mode;
        self
    }

    pub fn with_background_knowledge<S: Into<String>>(mut self, background: S) -> Self {
        self.background_knowledge = Some(background.into());
        self
    }

    pub fn with_problem_statement<S: Into<String>>(mut self, problem: S) -> Self {
        self.problem_statement = Some(problem.into());
        self
    }

    pub fn with_credentials(mut self, credentials: ProviderCredentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// The system prompt in effect for this configuration
    pub fn active_system_prompt(&self) -> &str {
        match (&self.system_prompt, self.mentor_mode) {
            (Some(prompt), _) => prompt,
            (None, true) => MENTOR_SYSTEM_PROMPT,
            (None, false) => DEFAULT_SYSTEM_PROMPT,
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_assistant_prompt() -> String {
    DEFAULT_ASSISTANT_PROMPT.to_string()
}

fn default_feedback_prompt() -> String {
    DEFAULT_FEEDBACK_PROMPT.to_string()
}

fn default_background_prompt() -> String {
    DEFAULT_BACKGROUND_PROMPT.to_string()
}

fn default_problem_statement_prompt() -> String {
    DEFAULT_PROBLEM_STATEMENT_PROMPT.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clean_env() {
        for (key, _) in env::vars() {
            if key.starts_with("STOCKFLOW_") {
                env::remove_var(&key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_default_settings() {
        clean_env();

        let config = EngineConfig::from_env().unwrap();
        assert_eq!(config.underlying_model, "gpt-4.1");
        assert!(!config.mentor_mode);
        assert!(config.background_knowledge.is_none());
        assert_eq!(config.feedback_prompt, DEFAULT_FEEDBACK_PROMPT);
        assert_eq!(config.active_system_prompt(), DEFAULT_SYSTEM_PROMPT);
        assert!(config.credentials.openai_api_key.is_none());
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        clean_env();
        env::set_var("STOCKFLOW_UNDERLYING_MODEL", "gemini-2.5-flash");
        env::set_var("STOCKFLOW_MENTOR_MODE", "true");
        env::set_var("STOCKFLOW_PROBLEM_STATEMENT", "Why do fisheries collapse?");
        env::set_var("STOCKFLOW_CREDENTIALS__GOOGLE_API_KEY", "test-key");

        let config = EngineConfig::from_env().unwrap();
        assert_eq!(config.underlying_model, "gemini-2.5-flash");
        assert!(config.mentor_mode);
        assert_eq!(
            config.problem_statement.as_deref(),
            Some("Why do fisheries collapse?")
        );
        assert_eq!(
            config.credentials.google_api_key.as_deref(),
            Some("test-key")
        );
        assert_eq!(config.active_system_prompt(), MENTOR_SYSTEM_PROMPT);

        clean_env();
    }

    #[test]
    fn test_system_prompt_override_wins_over_mentor_mode() {
        let mut config = EngineConfig::default().with_mentor_mode(true);
        config.system_prompt = Some("Custom".to_string());
        assert_eq!(config.active_system_prompt(), "Custom");
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let credentials = ProviderCredentials {
            openai_api_key: Some("sk-secret".to_string()),
            ..Default::default()
        };

        let debug = format!("{:?}", credentials);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_to_env_var() {
        assert_eq!(
            to_env_var("credentials.openai_api_key"),
            "STOCKFLOW_CREDENTIALS__OPENAI_API_KEY"
        );
    }
}
