use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::errors::{EngineError, EngineResult};
use crate::models::message::Role;

/// The provider families whose request shapes differ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Gemini,
    Claude,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Minimal,
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelCapabilities {
    pub provider: ProviderKind,
    pub supports_system_role: bool,
    pub supports_structured_output: bool,
    pub supports_temperature: bool,
}

impl ModelCapabilities {
    const fn new(
        provider: ProviderKind,
        supports_system_role: bool,
        supports_structured_output: bool,
        supports_temperature: bool,
    ) -> Self {
        Self {
            provider,
            supports_system_role,
            supports_structured_output,
            supports_temperature,
        }
    }

    /// Role to use for instructions that would normally go in a system message
    pub fn system_role(&self) -> Role {
        if self.supports_system_role {
            Role::System
        } else {
            Role::User
        }
    }
}

struct ModelEntry {
    prefix: &'static str,
    caps: ModelCapabilities,
}

/// Model families by id prefix. A prefix only matches a whole `-` separated token run,
/// and more specific prefixes come first.
const REGISTRY: &[ModelEntry] = &[
    ModelEntry {
        prefix: "o1-mini",
        caps: ModelCapabilities::new(ProviderKind::OpenAi, false, false, false),
    },
    ModelEntry {
        prefix: "o1-preview",
        caps: ModelCapabilities::new(ProviderKind::OpenAi, false, false, false),
    },
    ModelEntry {
        prefix: "o1",
        caps: ModelCapabilities::new(ProviderKind::OpenAi, true, true, false),
    },
    ModelEntry {
        prefix: "o3",
        caps: ModelCapabilities::new(ProviderKind::OpenAi, true, true, false),
    },
    ModelEntry {
        prefix: "o4",
        caps: ModelCapabilities::new(ProviderKind::OpenAi, true, true, false),
    },
    ModelEntry {
        prefix: "gpt-5",
        caps: ModelCapabilities::new(ProviderKind::OpenAi, true, true, false),
    },
    ModelEntry {
        prefix: "gpt-4o",
        caps: ModelCapabilities::new(ProviderKind::OpenAi, true, true, true),
    },
    ModelEntry {
        prefix: "gpt-4.1",
        caps: ModelCapabilities::new(ProviderKind::OpenAi, true, true, true),
    },
    ModelEntry {
        prefix: "gpt-4",
        caps: ModelCapabilities::new(ProviderKind::OpenAi, true, false, true),
    },
    ModelEntry {
        prefix: "gpt-3.5",
        caps: ModelCapabilities::new(ProviderKind::OpenAi, true, false, true),
    },
    ModelEntry {
        prefix: "gemini-1.5",
        caps: ModelCapabilities::new(ProviderKind::Gemini, true, true, true),
    },
    ModelEntry {
        prefix: "gemini-2.0",
        caps: ModelCapabilities::new(ProviderKind::Gemini, true, true, true),
    },
    ModelEntry {
        prefix: "gemini-2.5",
        caps: ModelCapabilities::new(ProviderKind::Gemini, true, true, true),
    },
    ModelEntry {
        prefix: "gemini-3",
        caps: ModelCapabilities::new(ProviderKind::Gemini, true, true, true),
    },
    ModelEntry {
        prefix: "claude-3",
        caps: ModelCapabilities::new(ProviderKind::Claude, true, true, true),
    },
    ModelEntry {
        prefix: "claude-sonnet-4",
        caps: ModelCapabilities::new(ProviderKind::Claude, true, true, true),
    },
    ModelEntry {
        prefix: "claude-opus-4",
        caps: ModelCapabilities::new(ProviderKind::Claude, true, true, true),
    },
    ModelEntry {
        prefix: "claude-haiku-4",
        caps: ModelCapabilities::new(ProviderKind::Claude, true, true, true),
    },
];

/// Base models that accept a trailing reasoning effort token, e.g. `o3-mini high`
const REASONING_MODELS: &[&str] = &["o1", "o3", "o3-mini", "o4-mini", "gpt-5", "gpt-5-mini"];

/// Resolve the capabilities of a model identifier.
///
/// The identifier must already have any reasoning effort suffix removed, see
/// [`parse_reasoning_effort`].
pub fn lookup(model_id: &str) -> EngineResult<ModelCapabilities> {
    let normalized = model_id.trim().to_lowercase();
    if normalized.contains(char::is_whitespace) {
        return Err(EngineError::UnsupportedModel(model_id.to_string()));
    }

    REGISTRY
        .iter()
        .find(|entry| matches_family(&normalized, entry.prefix))
        .map(|entry| entry.caps)
        .ok_or_else(|| EngineError::UnsupportedModel(model_id.to_string()))
}

/// `gpt-4` matches `gpt-4` and `gpt-4-turbo` but not `gpt-4o`.
fn matches_family(model_id: &str, prefix: &str) -> bool {
    model_id
        .strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('-'))
}

/// Split a configured model identifier into the base identifier and its reasoning effort.
///
/// Only the enumerated reasoning models followed by a single known effort token are
/// split; everything else comes back unchanged.
pub fn parse_reasoning_effort(model_id: &str) -> (String, Option<ReasoningEffort>) {
    let trimmed = model_id.trim();
    if let Some((base, suffix)) = trimmed.rsplit_once(' ') {
        let base = base.trim_end();
        let is_reasoning_model = REASONING_MODELS
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(base));

        if is_reasoning_model {
            if let Ok(effort) = suffix.parse::<ReasoningEffort>() {
                return (base.to_string(), Some(effort));
            }
        }
    }

    (trimmed.to_string(), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_openai_models() {
        for name in [
            "gpt-3.5-turbo",
            "GPT-4.1",
            "gpt-4.1-mini",
            "gpt-4o",
            "gpt-4o-mini",
            "gpt-4",
            "gpt-4-turbo",
            "gpt-5-mini",
            "o1-preview",
            "o4-mini",
            "o3",
        ] {
            let caps = lookup(name).unwrap();
            assert_eq!(caps.provider, ProviderKind::OpenAi, "{}", name);
        }
    }

    #[test]
    fn test_gemini_models() {
        for name in [
            "gemini-2.5-flash",
            "gemini-2.5-flash-lite-preview-06-17",
            "gemini-2.0-flash",
            "GEMINI-1.5-PRO",
            "gemini-3-pro-preview",
        ] {
            let caps = lookup(name).unwrap();
            assert_eq!(caps.provider, ProviderKind::Gemini, "{}", name);
        }
    }

    #[test]
    fn test_claude_models() {
        for name in [
            "claude-sonnet-4-5-20250929",
            "claude-opus-4-1",
            "claude-3-5-haiku-latest",
            "claude-haiku-4-5",
        ] {
            let caps = lookup(name).unwrap();
            assert_eq!(caps.provider, ProviderKind::Claude, "{}", name);
            assert!(caps.supports_system_role);
            assert!(caps.supports_structured_output);
            assert!(caps.supports_temperature);
        }
    }

    #[test]
    fn test_unknown_models_are_rejected() {
        for name in [
            "llama4:scout",
            "qwen3:32b",
            "phi4",
            "qwq",
            "",
            "o3 high",
            "o1xyz",
            "gpt-4oops",
            "gpt-",
            "claude-2",
            "claude-instant-1.2",
            "gemini-1.0-pro",
            "Gemini-Pro",
        ] {
            match lookup(name) {
                Err(EngineError::UnsupportedModel(model)) => assert_eq!(model, name),
                other => panic!("expected UnsupportedModel for {:?}, got {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_every_provider_is_registered() {
        for kind in ProviderKind::iter() {
            assert!(
                REGISTRY.iter().any(|entry| entry.caps.provider == kind),
                "no models registered for {}",
                kind
            );
        }
    }

    #[test]
    fn test_capability_flags() {
        let o1_mini = lookup("o1-mini").unwrap();
        assert!(!o1_mini.supports_system_role);
        assert!(!o1_mini.supports_structured_output);
        assert_eq!(o1_mini.system_role(), Role::User);

        let o3 = lookup("o3-mini").unwrap();
        assert!(o3.supports_system_role);
        assert!(!o3.supports_temperature);

        let gpt5 = lookup("gpt-5").unwrap();
        assert!(!gpt5.supports_temperature);

        let o1_preview = lookup("o1-preview").unwrap();
        assert!(!o1_preview.supports_system_role);
        assert!(!o1_preview.supports_structured_output);

        for name in ["gpt-4", "gpt-4-turbo", "gpt-3.5-turbo"] {
            assert!(!lookup(name).unwrap().supports_structured_output, "{}", name);
        }

        let gpt4 = lookup("gpt-4.1").unwrap();
        assert!(gpt4.supports_temperature);
        assert_eq!(gpt4.system_role(), Role::System);
    }

    #[test]
    fn test_parse_reasoning_effort() {
        assert_eq!(
            parse_reasoning_effort("o3-mini high"),
            ("o3-mini".to_string(), Some(ReasoningEffort::High))
        );
        assert_eq!(
            parse_reasoning_effort("o3 low"),
            ("o3".to_string(), Some(ReasoningEffort::Low))
        );
        assert_eq!(
            parse_reasoning_effort("gpt-5 minimal"),
            ("gpt-5".to_string(), Some(ReasoningEffort::Minimal))
        );
        assert_eq!(parse_reasoning_effort("o3"), ("o3".to_string(), None));
    }

    #[test]
    fn test_parse_reasoning_effort_leaves_other_ids_alone() {
        assert_eq!(
            parse_reasoning_effort("gpt-4o high"),
            ("gpt-4o high".to_string(), None)
        );
        assert_eq!(
            parse_reasoning_effort("o3 turbo"),
            ("o3 turbo".to_string(), None)
        );
        assert_eq!(
            parse_reasoning_effort("my custom model"),
            ("my custom model".to_string(), None)
        );
    }
}
