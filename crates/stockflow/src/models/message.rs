use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A role tagged message sent to an LLM
///
/// `content` of `None` or `Some("")` means the message carries nothing. Whitespace is
/// content.
pub struct Message {
    pub role: Role,
    pub content: Option<String>,
}

impl Message {
    pub fn new<S: Into<String>>(role: Role, content: S) -> Self {
        Message {
            role,
            content: Some(content.into()),
        }
    }

    pub fn system<S: Into<String>>(content: S) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user<S: Into<String>>(content: S) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// A message without any content at all
    pub fn empty(role: Role) -> Self {
        Message {
            role,
            content: None,
        }
    }

    pub fn has_content(&self) -> bool {
        self.content.as_deref().is_some_and(|text| !text.is_empty())
    }

    pub fn text(&self) -> Option<&str> {
        self.content.as_deref()
    }
}
