use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{Provider, ProviderReply, Usage};
use super::configs::AnthropicProviderConfig;
use super::formats::ProviderPayload;
use crate::conversation::ConversationRequest;
use crate::schema::SCHEMA_NAME;

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: Client,
    config: AnthropicProviderConfig,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    fn get_usage(data: &Value) -> Usage {
        let Some(usage) = data.get("usage") else {
            return Usage::default();
        };

        let input_tokens = usage
            .get("input_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);
        let output_tokens = usage
            .get("output_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);
        let total_tokens = match (input_tokens, output_tokens) {
            (Some(input), Some(output)) => Some(input + output),
            _ => None,
        };

        Usage::new(input_tokens, output_tokens, total_tokens)
    }

    /// The schema is offered as the only tool and the model is forced to call it,
    /// so the tool input is the structured model.
    fn build_payload(&self, request: &ConversationRequest) -> Result<Value> {
        let claude = match request.payload() {
            ProviderPayload::Claude(claude) => claude,
            other => return Err(anyhow!("Anthropic cannot send a {} payload", other.kind())),
        };

        let mut payload = json!({
            "model": request.model,
            "max_tokens": self.config.max_tokens,
            "messages": claude.messages,
            "tools": [{
                "name": SCHEMA_NAME,
                "description": "Record the stock and flow model",
                "input_schema": request.response_schema,
            }],
            "tool_choice": {"type": "tool", "name": SCHEMA_NAME},
        });

        if let Some(system) = claude.system {
            payload["system"] = json!(system);
        }
        if let Some(temperature) = request.temperature {
            payload["temperature"] = json!(temperature);
        }

        Ok(payload)
    }

    async fn post(&self, payload: Value) -> Result<Value> {
        let url = format!("{}/v1/messages", self.config.host.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
                Err(anyhow!("Server error: {}", status))
            }
            status => {
                let error_text = response.text().await?;
                Err(anyhow!("Request failed: {} - {}", status, error_text))
            }
        }
    }
}

fn reply_from_response(response: &Value) -> Result<ProviderReply> {
    let blocks = response
        .get("content")
        .and_then(|c| c.as_array())
        .cloned()
        .unwrap_or_default();

    if response.get("stop_reason").and_then(|r| r.as_str()) == Some("refusal") {
        let text = text_of(&blocks);
        let reason = if text.is_empty() {
            "the model refused to answer".to_string()
        } else {
            text
        };
        return Ok(ProviderReply::Refusal(reason));
    }

    if let Some(input) = blocks
        .iter()
        .find(|block| block.get("type").and_then(|t| t.as_str()) == Some("tool_use"))
        .and_then(|block| block.get("input"))
    {
        return Ok(ProviderReply::Parsed(input.clone()));
    }

    let text = text_of(&blocks);
    if text.is_empty() {
        return Err(anyhow!("Invalid response format from Anthropic API"));
    }
    Ok(ProviderReply::Text(text))
}

fn text_of(blocks: &[Value]) -> String {
    blocks
        .iter()
        .filter(|block| block.get("type").and_then(|t| t.as_str()) == Some("text"))
        .filter_map(|block| block.get("text").and_then(|t| t.as_str()))
        .collect::<Vec<_>>()
        .join("")
}

#[async_trait]
impl Provider for AnthropicProvider {
    async fn complete(&self, request: &ConversationRequest) -> Result<(ProviderReply, Usage)> {
        let payload = self.build_payload(request)?;
        let response = self.post(payload).await?;

        let reply = reply_from_response(&response)?;
        let usage = Self::get_usage(&response);

        Ok((reply, usage))
    }
}
