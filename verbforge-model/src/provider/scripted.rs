//! Scripted provider - replays canned replies in order.
//!
//! Used by the pipeline tests. Every prompt it receives is recorded so
//! callers can assert on what was sent.

use super::*;
use std::collections::VecDeque;
use std::sync::Mutex;

type Reply = std::result::Result<String, ProviderError>;

pub struct ScriptedProvider {
    model: String,
    replies: Mutex<VecDeque<Reply>>,
    prompts: Mutex<Vec<String>>,
    usage: Option<Usage>,
}

impl ScriptedProvider {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            replies: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            usage: None,
        }
    }

    /// Queue a successful reply
    pub fn with_reply(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()));
        self
    }

    /// Queue a failure
    pub fn with_error(self, error: ProviderError) -> Self {
        self.push(Err(error));
        self
    }

    /// Report fixed usage numbers instead of none
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Prompts received so far, oldest first
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Replies not yet consumed
    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|r| r.len()).unwrap_or(0)
    }

    fn push(&self, reply: Reply) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> std::result::Result<CompletionResponse, ProviderError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(request.prompt_text());
        }

        let reply = self
            .replies
            .lock()
            .map_err(|_| ProviderError::Other("scripted provider poisoned".into()))?
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Other("script exhausted".into())))?;

        let count = self.prompts.lock().map(|p| p.len()).unwrap_or(0);

        Ok(CompletionResponse {
            id: format!("scripted-{}", count),
            model: request.model.unwrap_or_else(|| self.model.clone()),
            content: if reply.is_empty() { None } else { Some(reply) },
            finish_reason: FinishReason::Stop,
            usage: self.usage.clone().unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replies_in_order_and_records_prompts() {
        let provider = ScriptedProvider::new("test-model")
            .with_reply("first")
            .with_reply("second");

        assert_eq!(provider.prompt("a").await.unwrap(), "first");
        assert_eq!(provider.prompt("b").await.unwrap(), "second");
        assert_eq!(provider.prompts(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(provider.remaining(), 0);
    }

    #[tokio::test]
    async fn test_exhausted_script_fails() {
        let provider = ScriptedProvider::new("test-model");
        let err = provider.prompt("anything").await.unwrap_err();
        assert!(err.to_string().contains("script exhausted"));
    }

    #[tokio::test]
    async fn test_queued_error_and_usage() {
        let provider = ScriptedProvider::new("test-model")
            .with_usage(Usage::new(10, 4))
            .with_error(ProviderError::RateLimited { retry_after: None })
            .with_reply("ok");

        let request = CompletionRequest::new(vec![ChatMessage::user("x")]);
        assert!(matches!(
            provider.complete(request.clone()).await,
            Err(ProviderError::RateLimited { .. })
        ));

        let response = provider.complete(request).await.unwrap();
        assert_eq!(response.usage.total_tokens, 14);
        assert_eq!(response.model, "test-model");
    }
}
