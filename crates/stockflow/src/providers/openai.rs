use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{Provider, ProviderReply, Usage};
use super::configs::OpenAiProviderConfig;
use super::formats::ProviderPayload;
use crate::conversation::ConversationRequest;
use crate::schema::SCHEMA_NAME;

pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> Result<Self> {
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
            .get("prompt_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);

        let output_tokens = usage
            .get("completion_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);

        let total_tokens = usage
            .get("total_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32)
            .or_else(|| match (input_tokens, output_tokens) {
                (Some(input), Some(output)) => Some(input + output),
                _ => None,
            });

        Usage::new(input_tokens, output_tokens, total_tokens)
    }

    fn build_payload(request: &ConversationRequest) -> Result<Value> {
        let messages = match request.payload() {
            ProviderPayload::OpenAi(messages) => messages,
            other => return Err(anyhow!("OpenAI cannot send a {} payload", other.kind())),
        };

        let mut payload = json!({
            "model": request.model,
            "messages": messages,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": SCHEMA_NAME,
                    "strict": true,
                    "schema": request.response_schema,
                }
            }
        });

        if let Some(temperature) = request.temperature {
            payload["temperature"] = json!(temperature);
        }
        if let Some(effort) = request.reasoning_effort {
            payload["reasoning_effort"] = json!(effort);
        }

        Ok(payload)
    }

    async fn post(&self, payload: Value) -> Result<Value> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.host.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
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

/// Interpret the first choice of a chat completion
fn reply_from_response(response: &Value) -> Result<ProviderReply> {
    if let Some(error) = response.get("error") {
        return Err(anyhow!("OpenAI API error: {}", error));
    }

    let message = &response["choices"][0]["message"];
    if let Some(refusal) = message.get("refusal").and_then(|r| r.as_str()) {
        return Ok(ProviderReply::Refusal(refusal.to_string()));
    }

    message
        .get("content")
        .and_then(|c| c.as_str())
        .map(|content| ProviderReply::Text(content.to_string()))
        .ok_or_else(|| anyhow!("No content in OpenAI response"))
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(&self, request: &ConversationRequest) -> Result<(ProviderReply, Usage)> {
        let payload = Self::build_payload(request)?;
        let response = self.post(payload).await?;

        let reply = reply_from_response(&response)?;
        let usage = Self::get_usage(&response);

        Ok((reply, usage))
    }
}
