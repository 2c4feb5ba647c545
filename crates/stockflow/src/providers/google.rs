use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{Provider, ProviderReply, Usage};
use super::configs::GoogleProviderConfig;
use super::formats::ProviderPayload;
use crate::conversation::ConversationRequest;

/// Finish reasons Gemini uses when it withholds an answer
const REFUSAL_FINISH_REASONS: &[&str] = &["SAFETY", "PROHIBITED_CONTENT", "BLOCKLIST", "SPII"];

pub struct GoogleProvider {
    client: Client,
    config: GoogleProviderConfig,
}

impl GoogleProvider {
    pub fn new(config: GoogleProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    fn get_usage(data: &Value) -> Usage {
        let Some(usage) = data.get("usageMetadata") else {
            return Usage::default();
        };

        let count = |field: &str| usage.get(field).and_then(|v| v.as_i64()).map(|v| v as i32);

        Usage::new(
            count("promptTokenCount"),
            count("candidatesTokenCount"),
            count("totalTokenCount"),
        )
    }

    fn build_payload(request: &ConversationRequest) -> Result<Value> {
        let gemini = match request.payload() {
            ProviderPayload::Gemini(gemini) => gemini,
            other => return Err(anyhow!("Gemini cannot send a {} payload", other.kind())),
        };

        let mut generation_config = json!({
            "responseMimeType": "application/json",
            "responseJsonSchema": request.response_schema,
        });
        if let Some(temperature) = request.temperature {
            generation_config["temperature"] = json!(temperature);
        }

        let mut payload = json!({
            "contents": gemini.contents,
            "generationConfig": generation_config,
        });
        if let Some(system) = gemini.system_instruction.filter(|s| !s.is_empty()) {
            payload["systemInstruction"] = json!({"parts": [{"text": system}]});
        }

        Ok(payload)
    }

    async fn post(&self, model: &str, payload: Value) -> Result<Value> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.host.trim_end_matches('/'),
            model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
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
    if let Some(reason) = response
        .get("promptFeedback")
        .and_then(|f| f.get("blockReason"))
        .and_then(|r| r.as_str())
    {
        return Ok(ProviderReply::Refusal(format!("prompt blocked: {}", reason)));
    }

    let candidate = response
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| anyhow!("No candidates in Gemini response"))?;

    if let Some(reason) = candidate.get("finishReason").and_then(|r| r.as_str()) {
        if REFUSAL_FINISH_REASONS.contains(&reason) {
            return Ok(ProviderReply::Refusal(format!("response blocked: {}", reason)));
        }
    }

    let text: String = candidate["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        return Err(anyhow!("Invalid response format from Gemini API"));
    }
    Ok(ProviderReply::Text(text))
}

#[async_trait]
impl Provider for GoogleProvider {
    async fn complete(&self, request: &ConversationRequest) -> Result<(ProviderReply, Usage)> {
        let payload = Self::build_payload(request)?;
        let response = self.post(&request.model, payload).await?;

        let reply = reply_from_response(&response)?;
        let usage = Self::get_usage(&response);

        Ok((reply, usage))
    }
}
