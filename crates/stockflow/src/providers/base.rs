use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::conversation::ConversationRequest;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }
}

/// What a provider handed back for a model generation request
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderReply {
    /// Structured output the provider already parsed
    Parsed(Value),
    /// Raw text that should contain the JSON model
    Text(String),
    /// The provider declined to answer
    Refusal(String),
}

/// Base trait for LLM providers (OpenAI, Anthropic, Gemini)
#[async_trait]
pub trait Provider: Send + Sync {
    /// Send one conversation and return the reply
    async fn complete(&self, request: &ConversationRequest) -> Result<(ProviderReply, Usage)>;
}
