use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::conversation::ConversationBuilder;
use crate::errors::{EngineError, EngineResult};
use crate::models::causal::CausalModel;
use crate::normalizer::normalize;
use crate::providers::base::{Provider, ProviderReply};
use crate::providers::capabilities::{lookup, parse_reasoning_effort, ProviderKind};
use crate::providers::configs::ProviderConfig;
use crate::providers::factory::get_provider;
use crate::render::{ExplanationRenderer, PassthroughRenderer};

/// Generates stock and flow models from text through one LLM provider
pub struct QuantitativeEngine {
    provider: Box<dyn Provider>,
    renderer: Box<dyn ExplanationRenderer>,
    /// Family the provider speaks; `None` accepts any
    provider_kind: Option<ProviderKind>,
}

impl QuantitativeEngine {
    pub fn new(provider: Box<dyn Provider>) -> Self {
        Self {
            provider,
            renderer: Box::new(PassthroughRenderer),
            provider_kind: None,
        }
    }

    /// Only accept configurations whose model belongs to `kind`
    pub fn for_provider_kind(mut self, kind: ProviderKind) -> Self {
        self.provider_kind = Some(kind);
        self
    }

    pub fn with_renderer(mut self, renderer: Box<dyn ExplanationRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Create an engine talking to the provider family of `config.underlying_model`
    pub fn from_config(config: &EngineConfig) -> EngineResult<Self> {
        let (model, _) = parse_reasoning_effort(&config.underlying_model);
        let capabilities = lookup(&model)?;
        let provider_config =
            ProviderConfig::from_credentials(capabilities.provider, &config.credentials)?;
        Ok(Self::new(get_provider(provider_config)?).for_provider_kind(capabilities.provider))
    }

    /// Turn `user_prompt` into a normalized causal model.
    ///
    /// With `prior_model` the LLM is asked to revise that model instead of
    /// starting over.
    pub async fn generate(
        &self,
        user_prompt: &str,
        prior_model: Option<&CausalModel>,
        config: &EngineConfig,
    ) -> EngineResult<CausalModel> {
        let request = ConversationBuilder::new(config).build(user_prompt, prior_model)?;
        let needed = request.provider();
        if let Some(engine) = self.provider_kind.filter(|kind| *kind != needed) {
            return Err(EngineError::ProviderMismatch {
                model: request.model,
                needed,
                engine,
            });
        }
        info!(
            model = %request.model,
            provider = %request.provider(),
            revision = prior_model.is_some(),
            "generating model"
        );

        let (reply, usage) = self.provider.complete(&request).await?;
        debug!(
            input_tokens = ?usage.input_tokens,
            output_tokens = ?usage.output_tokens,
            total_tokens = ?usage.total_tokens,
            "provider usage"
        );

        let raw = interpret_reply(reply)?;
        let mut model = normalize(raw)?;

        if let Some(explanation) = model.explanation.take() {
            let rendered = self
                .renderer
                .render(&explanation)
                .map_err(|e| EngineError::Render(e.to_string()))?;
            model.explanation = Some(rendered);
        }

        info!(
            variables = model.variables.len(),
            relationships = model.relationships.len(),
            "generated model"
        );
        Ok(model)
    }
}

/// Turn a provider reply into the raw JSON model.
///
/// Text gets exactly one parse attempt, nothing is stripped or repaired first.
pub fn interpret_reply(reply: ProviderReply) -> EngineResult<Value> {
    match reply {
        ProviderReply::Parsed(value) => Ok(value),
        ProviderReply::Text(text) => serde_json::from_str(&text).map_err(|e| {
            warn!(error = %e, "LLM reply is not valid JSON");
            EngineError::MalformedOutput(format!("Bad JSON returned by underlying LLM: {}", e))
        }),
        ProviderReply::Refusal(reason) => {
            warn!(reason = %reason, "LLM refused to generate a model");
            Err(EngineError::Refusal(reason))
        }
    }
}

/// Build an engine for `config` and run a single generation
pub async fn generate(
    user_prompt: &str,
    prior_model: Option<&CausalModel>,
    config: &EngineConfig,
) -> EngineResult<CausalModel> {
    QuantitativeEngine::from_config(config)?
        .generate(user_prompt, prior_model, config)
        .await
}
