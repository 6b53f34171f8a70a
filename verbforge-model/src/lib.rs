//! # verbforge model layer
//!
//! Everything the pipeline needs to talk to a language model.
//!
//! ## Core Concepts
//! - **Provider**: trait-based LLM communication (Gemini, OpenAI-compatible, Anthropic)
//! - **Retry**: bounded exponential backoff around retryable failures
//! - **Usage**: per-call token/cost observations and the cumulative report
//! - **Scripted provider**: canned replies for deterministic tests

pub mod error;
pub mod provider;
pub mod retry;
pub mod usage;

pub use error::{Error, ErrorKind, ErrorStatus, Result};
pub use provider::{
    AnthropicProvider, ChatMessage, CompletionRequest, CompletionResponse, FinishReason,
    GeminiProvider, LlmProvider, OpenAIProvider, Provider, ProviderConfig, ProviderError,
    ProviderType, Role, ScriptedProvider, Usage,
};
pub use retry::{execute_with_retry, RetryConfig};
pub use usage::{estimate_tokens, ModelPrice, ModelTotals, UsageObservation, UsageReport, UsageTracker};
