use thiserror::Error;

use crate::providers::capabilities::ProviderKind;

/// Errors surfaced to callers of [`crate::engine::QuantitativeEngine::generate`].
///
/// Structural problems inside an otherwise well formed model are not errors,
/// the normalizer repairs those.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    #[error("Unsupported LLM {model}: {reason}")]
    Capability { model: String, reason: String },

    #[error("Model {model} needs a {needed} provider but the engine talks to {engine}")]
    ProviderMismatch {
        model: String,
        needed: ProviderKind,
        engine: ProviderKind,
    },

    #[error("The model refused to answer: {0}")]
    Refusal(String),

    #[error("Malformed output from the model: {0}")]
    MalformedOutput(String),

    #[error("Failed to render prompt template: {0}")]
    Prompt(#[from] tera::Error),

    #[error("Failed to render explanation: {0}")]
    Render(String),

    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

impl EngineError {
    pub fn capability<M: Into<String>, R: Into<String>>(model: M, reason: R) -> Self {
        EngineError::Capability {
            model: model.into(),
            reason: reason.into(),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
