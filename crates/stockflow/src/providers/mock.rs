use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::Mutex;

use crate::conversation::ConversationRequest;
use crate::providers::base::{Provider, ProviderReply, Usage};

/// A mock provider that returns pre-configured replies and records what it was sent
pub struct MockProvider {
    replies: Arc<Mutex<Vec<Result<ProviderReply>>>>,
    requests: Arc<Mutex<Vec<ConversationRequest>>>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of replies
    pub fn new(replies: Vec<ProviderReply>) -> Self {
        Self::scripted(replies.into_iter().map(Ok).collect())
    }

    /// Like `new`, but individual calls may fail
    pub fn scripted(replies: Vec<Result<ProviderReply>>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared handle to the requests seen so far
    pub fn requests(&self) -> Arc<Mutex<Vec<ConversationRequest>>> {
        Arc::clone(&self.requests)
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, request: &ConversationRequest) -> Result<(ProviderReply, Usage)> {
        self.requests.lock().unwrap().push(request.clone());

        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            return Err(anyhow!("MockProvider has no more replies"));
        }
        let reply = replies.remove(0)?;
        Ok((reply, Usage::new(Some(10), Some(5), Some(15))))
    }
}
