//! Example: Check that a provider answers before running the whole pipeline
//!
//! Run with:
//!   # Use Gemini (default):
//!   GEMINI_API_KEY=xxx cargo run --example test_provider
//!
//!   # Use OpenAI:
//!   OPENAI_API_KEY=sk-xxx cargo run --example test_provider -- --openai
//!
//!   # Use Anthropic:
//!   ANTHROPIC_API_KEY=sk-xxx cargo run --example test_provider -- --anthropic
//!
//!   # Use local Ollama:
//!   cargo run --example test_provider -- --ollama
//!
//!   # Just output the prompt:
//!   cargo run --example test_provider -- --prompt-only

use std::env;
use verbforge_model::{
    error::from_provider, execute_with_retry, ChatMessage, CompletionRequest, LlmProvider,
    Provider, ProviderConfig, ProviderType, RetryConfig, UsageTracker,
};

const SYSTEM_PROMPT: &str = "You are a concise assistant for language learners.";
const USER_PROMPT: &str = "Conjugate the Spanish verb 'tener' in the present tense. \
                           Answer with one line per person and nothing else.";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let provider_type = if args.iter().any(|arg| arg == "--openai") {
        ProviderType::OpenAI
    } else if args.iter().any(|arg| arg == "--anthropic") {
        ProviderType::Anthropic
    } else if args.iter().any(|arg| arg == "--ollama") {
        ProviderType::Local
    } else {
        ProviderType::Gemini
    };
    let prompt_only = args.iter().any(|arg| arg == "--prompt-only");

    if prompt_only {
        println!("=== SYSTEM PROMPT ===\n{}\n", SYSTEM_PROMPT);
        println!("=== USER PROMPT ===\n{}\n", USER_PROMPT);
        return Ok(());
    }

    let provider = Provider::from_config(ProviderConfig::from_env(provider_type)?)?;
    println!("Using {} ({})...", provider.name(), provider.default_model());

    let request = CompletionRequest::new(vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(USER_PROMPT),
    ])
    .with_max_tokens(256);

    let response = execute_with_retry(&RetryConfig::default(), || {
        let request = request.clone();
        let provider = &provider;
        async move {
            provider
                .complete(request)
                .await
                .map_err(|e| from_provider(e, provider.name(), provider.default_model()))
        }
    })
    .await?;

    println!("\n=== RESPONSE ({:?}) ===", response.finish_reason);
    println!("{}", response.content.as_deref().unwrap_or("(empty)"));

    let mut usage = UsageTracker::new();
    usage.track("probe", &response.model, &response.usage, response.usage.is_empty());
    println!("\n=== USAGE ===\n{}", usage.report().summary());

    Ok(())
}
