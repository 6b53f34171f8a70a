//! Tracking agent - the only path from the pipeline to the model.
//!
//! Every call goes through `generate_content`, which applies the retry policy
//! and records one usage observation. The accumulator lives inside the agent,
//! and the agent lives for exactly one pipeline run.

use crate::layout::write_file;
use std::path::PathBuf;
use verbforge_model::error::from_provider;
use verbforge_model::{
    estimate_tokens, execute_with_retry, ChatMessage, CompletionRequest, Error, LlmProvider,
    Result, RetryConfig, Usage, UsageReport, UsageTracker,
};

pub struct TrackingAgent<'p, P: LlmProvider> {
    provider: &'p P,
    model: String,
    temperature: Option<f32>,
    retry: RetryConfig,
    report_path: PathBuf,
    usage: UsageTracker,
}

impl<'p, P: LlmProvider> TrackingAgent<'p, P> {
    pub fn new(provider: &'p P, report_path: impl Into<PathBuf>) -> Self {
        Self {
            provider,
            model: provider.default_model().to_string(),
            temperature: None,
            retry: RetryConfig::default(),
            report_path: report_path.into(),
            usage: UsageTracker::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn usage(&self) -> &UsageTracker {
        &self.usage
    }

    /// Send `prompt` to the model and return its text.
    ///
    /// Tokens are recorded under `stage` even when the reply turns out empty.
    pub async fn generate_content(&mut self, stage: &str, prompt: &str) -> Result<String> {
        let provider = self.provider;
        let model = self.model.as_str();

        let mut request = CompletionRequest::new(vec![ChatMessage::user(prompt)]).with_model(model);
        if let Some(t) = self.temperature {
            request = request.with_temperature(t);
        }

        let response = execute_with_retry(&self.retry, || {
            let request = request.clone();
            async move {
                provider
                    .complete(request)
                    .await
                    .map_err(|e| from_provider(e, provider.name(), model))
            }
        })
        .await
        .map_err(|e| {
            e.with_operation("tracking::generate_content")
                .with_context("stage", stage)
        })?;

        let content = response.content.unwrap_or_default();
        let (usage, estimated) = if response.usage.is_empty() {
            (Usage::new(estimate_tokens(prompt), estimate_tokens(&content)), true)
        } else {
            (response.usage, false)
        };
        let recorded_model = if response.model.is_empty() {
            self.model.clone()
        } else {
            response.model
        };

        let observation = self.usage.track(stage, &recorded_model, &usage, estimated);
        tracing::info!(
            stage,
            model = %observation.model,
            prompt_tokens = observation.prompt_tokens,
            completion_tokens = observation.completion_tokens,
            estimated,
            "model call complete"
        );

        if content.trim().is_empty() {
            return Err(Error::empty_response(stage)
                .with_operation("tracking::generate_content")
                .with_context("model", recorded_model));
        }
        Ok(content)
    }

    /// Write the accumulated usage as pretty JSON to the report path
    pub fn save_usage_report(&self) -> Result<UsageReport> {
        let report = self.usage.report();
        let json = report.to_json_pretty()?;

        write_file(&self.report_path, &json).map_err(|e| e.with_operation("tracking::save_usage_report"))?;

        tracing::info!(
            path = %self.report_path.display(),
            calls = report.total_calls,
            tokens = report.total_tokens,
            "usage report saved"
        );
        Ok(report)
    }
}
