//! Conversion of provider-agnostic messages into each provider family's wire shape.
//!
//! The families differ along three independent axes:
//! - whether system messages after the first one are demoted to `user`
//! - whether messages without content are dropped
//! - the field names and nesting of the payload
//!
//! Callers pick a family once through [`ProviderPayload::from_messages`] and never
//! special-case a provider themselves.

use serde::{Deserialize, Serialize};

use super::capabilities::ProviderKind;
use crate::models::message::{Message, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeminiRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeminiPart {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeminiContent {
    pub role: GeminiRole,
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiPayload {
    pub system_instruction: Option<String>,
    pub contents: Vec<GeminiContent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaudeRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaudeMessage {
    pub role: ClaudeRole,
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaudePayload {
    pub system: Option<String>,
    pub messages: Vec<ClaudeMessage>,
}

/// A conversation shaped for one provider family
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderPayload {
    Gemini(GeminiPayload),
    Claude(ClaudePayload),
    OpenAi(Vec<Message>),
}

impl ProviderPayload {
    pub fn from_messages(kind: ProviderKind, messages: &[Message]) -> Self {
        match kind {
            ProviderKind::Gemini => ProviderPayload::Gemini(messages_to_gemini_spec(messages)),
            ProviderKind::Claude => ProviderPayload::Claude(messages_to_anthropic_spec(messages)),
            ProviderKind::OpenAi => ProviderPayload::OpenAi(messages_to_openai_spec(messages)),
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderPayload::Gemini(_) => ProviderKind::Gemini,
            ProviderPayload::Claude(_) => ProviderKind::Claude,
            ProviderPayload::OpenAi(_) => ProviderKind::OpenAi,
        }
    }
}

/// Convert messages to the Gemini `generateContent` shape.
///
/// The first system message becomes the system instruction. Everything else is kept
/// only when it carries content, since Gemini rejects empty parts.
pub fn messages_to_gemini_spec(messages: &[Message]) -> GeminiPayload {
    let mut system_instruction = None;
    let mut system_seen = false;
    let mut contents = Vec::new();

    for message in messages {
        if message.role == Role::System && !system_seen {
            system_seen = true;
            system_instruction = message.content.clone();
            continue;
        }

        if !message.has_content() {
            continue;
        }

        let role = match message.role {
            Role::System | Role::User => GeminiRole::User,
            Role::Assistant => GeminiRole::Model,
        };

        contents.push(GeminiContent {
            role,
            parts: vec![GeminiPart {
                text: message.content.clone().unwrap_or_default(),
            }],
        });
    }

    GeminiPayload {
        system_instruction,
        contents,
    }
}

/// Convert messages to the Anthropic messages shape.
///
/// The first system message becomes the top level `system` field. Every other message
/// is forwarded in order with its content untouched, empty or not.
pub fn messages_to_anthropic_spec(messages: &[Message]) -> ClaudePayload {
    let mut system = None;
    let mut system_seen = false;
    let mut converted = Vec::with_capacity(messages.len());

    for message in messages {
        let role = match message.role {
            Role::System if !system_seen => {
                system_seen = true;
                system = message.content.clone();
                continue;
            }
            Role::System | Role::User => ClaudeRole::User,
            Role::Assistant => ClaudeRole::Assistant,
        };

        converted.push(ClaudeMessage {
            role,
            content: message.content.clone(),
        });
    }

    ClaudePayload {
        system,
        messages: converted,
    }
}

/// OpenAI accepts the provider-agnostic shape as is.
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Message> {
    messages.to_vec()
}
