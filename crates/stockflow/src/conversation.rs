use serde_json::Value;
use tracing::debug;

use crate::config::EngineConfig;
use crate::errors::{EngineError, EngineResult};
use crate::models::causal::CausalModel;
use crate::models::message::{Message, Role};
use crate::prompt_template::{
    render_with_placeholder, BACKGROUND_PLACEHOLDER, PROBLEM_STATEMENT_PLACEHOLDER,
};
use crate::providers::capabilities::{
    lookup, parse_reasoning_effort, ModelCapabilities, ProviderKind, ReasoningEffort,
};
use crate::providers::formats::ProviderPayload;
use crate::schema::causal_model_schema;

/// Everything a provider needs to run one model generation
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationRequest {
    pub messages: Vec<Message>,
    /// Model identifier with any reasoning effort suffix removed
    pub model: String,
    pub capabilities: ModelCapabilities,
    pub response_schema: Value,
    pub temperature: Option<f32>,
    pub reasoning_effort: Option<ReasoningEffort>,
}

impl ConversationRequest {
    pub fn provider(&self) -> ProviderKind {
        self.capabilities.provider
    }

    /// The messages shaped for this request's provider family
    pub fn payload(&self) -> ProviderPayload {
        ProviderPayload::from_messages(self.provider(), &self.messages)
    }
}

pub struct ConversationBuilder<'a> {
    config: &'a EngineConfig,
}

impl<'a> ConversationBuilder<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    pub fn build(
        &self,
        user_prompt: &str,
        prior_model: Option<&CausalModel>,
    ) -> EngineResult<ConversationRequest> {
        let (model, reasoning_effort) = parse_reasoning_effort(&self.config.underlying_model);
        let capabilities = lookup(&model)?;
        self.assemble(model, reasoning_effort, capabilities, user_prompt, prior_model)
    }

    fn assemble(
        &self,
        model: String,
        reasoning_effort: Option<ReasoningEffort>,
        capabilities: ModelCapabilities,
        user_prompt: &str,
        prior_model: Option<&CausalModel>,
    ) -> EngineResult<ConversationRequest> {
        let config = self.config;

        if !capabilities.supports_structured_output {
            return Err(EngineError::capability(
                &config.underlying_model,
                "it does not support structured outputs which are required",
            ));
        }

        let mut temperature = Some(0.0);
        if !capabilities.supports_system_role {
            temperature = Some(1.0);
        }
        if !capabilities.supports_temperature {
            temperature = None;
        }

        let system_role = capabilities.system_role();
        let mut messages = vec![Message::new(system_role, config.active_system_prompt())];

        if let Some(background) = non_empty(config.background_knowledge.as_deref()) {
            let content = render_with_placeholder(
                &config.background_prompt,
                BACKGROUND_PLACEHOLDER,
                background,
            )?;
            messages.push(Message::new(system_role, content));
        }

        if let Some(problem) = non_empty(config.problem_statement.as_deref()) {
            let content = render_with_placeholder(
                &config.problem_statement_prompt,
                PROBLEM_STATEMENT_PLACEHOLDER,
                problem,
            )?;
            messages.push(Message::new(system_role, content));
        }

        if let Some(prior) = prior_model {
            let serialized = serde_json::to_string_pretty(prior)
                .map_err(|e| EngineError::MalformedOutput(format!("prior model: {}", e)))?;
            messages.push(Message::new(Role::Assistant, serialized));

            if !config.assistant_prompt.trim().is_empty() {
                messages.push(Message::user(config.assistant_prompt.as_str()));
            }
        }

        messages.push(Message::user(user_prompt));
        messages.push(Message::user(config.feedback_prompt.as_str()));

        debug!(
            model = %model,
            provider = %capabilities.provider,
            messages = messages.len(),
            temperature = ?temperature,
            reasoning_effort = ?reasoning_effort,
            "built conversation"
        );

        Ok(ConversationRequest {
            messages,
            model,
            capabilities,
            response_schema: causal_model_schema(config.mentor_mode),
            temperature,
            reasoning_effort,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::causal::{Relationship, Variable};
    use crate::prompt_template::{
        DEFAULT_ASSISTANT_PROMPT, DEFAULT_FEEDBACK_PROMPT, DEFAULT_SYSTEM_PROMPT,
        MENTOR_SYSTEM_PROMPT,
    };

    fn roles(request: &ConversationRequest) -> Vec<Role> {
        request.messages.iter().map(|m| m.role).collect()
    }

    #[test]
    fn test_minimal_conversation() {
        let config = EngineConfig::new("gpt-4.1");
        let request = ConversationBuilder::new(&config)
            .build("Fish populations shrink when fishing grows.", None)
            .unwrap();

        assert_eq!(request.model, "gpt-4.1");
        assert_eq!(request.provider(), ProviderKind::OpenAi);
        assert_eq!(request.temperature, Some(0.0));
        assert_eq!(request.reasoning_effort, None);
        assert_eq!(roles(&request), vec![Role::System, Role::User, Role::User]);
        assert_eq!(request.messages[0].text(), Some(DEFAULT_SYSTEM_PROMPT));
        assert_eq!(
            request.messages[1].text(),
            Some("Fish populations shrink when fishing grows.")
        );
        assert_eq!(request.messages[2].text(), Some(DEFAULT_FEEDBACK_PROMPT));
    }

    #[test]
    fn test_full_conversation_order() {
        let config = EngineConfig::new("claude-sonnet-4-5-20250929")
            .with_background_knowledge("Fish reproduce slowly.")
            .with_problem_statement("Why do fisheries collapse?");
        let prior = CausalModel::new(
            vec![Variable::stock("Fish"), Variable::variable("Fishing")],
            vec![Relationship::negative("Fishing", "Fish")],
        );

        let request = ConversationBuilder::new(&config)
            .build("Add the fleet size.", Some(&prior))
            .unwrap();

        assert_eq!(
            roles(&request),
            vec![
                Role::System,
                Role::System,
                Role::System,
                Role::Assistant,
                Role::User,
                Role::User,
                Role::User,
            ]
        );
        assert!(request.messages[1]
            .text()
            .unwrap()
            .contains("Fish reproduce slowly."));
        assert!(request.messages[2]
            .text()
            .unwrap()
            .contains("Why do fisheries collapse?"));

        let echoed: CausalModel =
            serde_json::from_str(request.messages[3].text().unwrap()).unwrap();
        assert_eq!(echoed, prior);

        assert_eq!(request.messages[4].text(), Some(DEFAULT_ASSISTANT_PROMPT));
        assert_eq!(request.messages[5].text(), Some("Add the fleet size."));
        assert_eq!(request.messages[6].text(), Some(DEFAULT_FEEDBACK_PROMPT));
    }

    #[test]
    fn test_empty_revision_prompt_is_skipped() {
        let mut config = EngineConfig::new("gpt-4.1");
        config.assistant_prompt = String::new();
        let prior = CausalModel::default();

        let request = ConversationBuilder::new(&config)
            .build("More detail please.", Some(&prior))
            .unwrap();

        assert_eq!(
            roles(&request),
            vec![Role::System, Role::Assistant, Role::User, Role::User]
        );
    }

    #[test]
    fn test_mentor_mode_selects_mentor_prompt() {
        let config = EngineConfig::new("gpt-4.1").with_mentor_mode(true);
        let request = ConversationBuilder::new(&config).build("text", None).unwrap();

        assert_eq!(request.messages[0].text(), Some(MENTOR_SYSTEM_PROMPT));
        assert_eq!(request.response_schema, causal_model_schema(true));
    }

    #[test]
    fn test_reasoning_effort_is_split_and_temperature_dropped() {
        let config = EngineConfig::new("o3-mini high");
        let request = ConversationBuilder::new(&config).build("text", None).unwrap();

        assert_eq!(request.model, "o3-mini");
        assert_eq!(request.reasoning_effort, Some(ReasoningEffort::High));
        assert_eq!(request.temperature, None);
        assert_eq!(request.messages[0].role, Role::System);
    }

    #[test]
    fn test_model_without_structured_output_fails_fast() {
        let config = EngineConfig::new("o1-mini");
        let result = ConversationBuilder::new(&config).build("text", None);

        match result {
            Err(EngineError::Capability { model, .. }) => assert_eq!(model, "o1-mini"),
            other => panic!("expected capability error, got {:?}", other),
        }
    }

    #[test]
    fn test_models_without_json_schema_fail_fast() {
        for model in ["o1-preview", "gpt-4", "gpt-3.5-turbo"] {
            let config = EngineConfig::new(model);
            let result = ConversationBuilder::new(&config).build("text", None);
            assert!(
                matches!(result, Err(EngineError::Capability { .. })),
                "{} should be rejected",
                model
            );
        }
    }

    #[test]
    fn test_unknown_model_is_rejected() {
        for model in ["llama4:scout", "o1xyz", "claude-2"] {
            let config = EngineConfig::new(model);
            let result = ConversationBuilder::new(&config).build("text", None);
            assert!(matches!(result, Err(EngineError::UnsupportedModel(_))), "{}", model);
        }
    }

    #[test]
    fn test_missing_system_role_uses_user_and_temperature_one() {
        let capabilities = ModelCapabilities {
            provider: ProviderKind::OpenAi,
            supports_system_role: false,
            supports_structured_output: true,
            supports_temperature: true,
        };
        let config = EngineConfig::new("gpt-4.1").with_problem_statement("Why?");

        let request = build_with_capabilities(&config, capabilities);

        assert_eq!(request.messages[0].role, Role::User);
        assert_eq!(request.messages[1].role, Role::User);
        assert_eq!(request.temperature, Some(1.0));
    }

    #[test]
    fn test_template_errors_surface() {
        let mut config = EngineConfig::new("gpt-4.1").with_background_knowledge("facts");
        config.background_prompt = "{{ background_knowledge }} {% if %}".to_string();

        let result = ConversationBuilder::new(&config).build("text", None);
        assert!(matches!(result, Err(EngineError::Prompt(_))));
    }

    #[test]
    fn test_payload_uses_request_provider() {
        let config = EngineConfig::new("gemini-2.5-flash");
        let request = ConversationBuilder::new(&config).build("text", None).unwrap();

        match request.payload() {
            ProviderPayload::Gemini(payload) => {
                assert_eq!(payload.system_instruction.as_deref(), Some(DEFAULT_SYSTEM_PROMPT));
                assert_eq!(payload.contents.len(), 2);
            }
            other => panic!("expected gemini payload, got {:?}", other),
        }
    }

    fn build_with_capabilities(
        config: &EngineConfig,
        capabilities: ModelCapabilities,
    ) -> ConversationRequest {
        ConversationBuilder::new(config)
            .assemble(
                config.underlying_model.clone(),
                None,
                capabilities,
                "text",
                None,
            )
            .unwrap()
    }
}
