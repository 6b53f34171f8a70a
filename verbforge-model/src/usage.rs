//! Usage accounting - one observation per model call, summed into a report.
//!
//! A `UsageTracker` belongs to a single pipeline run. Totals are plain sums of
//! the recorded observations; there is no windowing or eviction.

use crate::error::{Error, Result};
use crate::provider::Usage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rough token estimate for backends that report no usage: 4 chars per token
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        0
    } else {
        text.len() / 4 + 1
    }
}

/// Price in USD per million tokens
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPrice {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl ModelPrice {
    const fn new(input_per_million: f64, output_per_million: f64) -> Self {
        Self { input_per_million, output_per_million }
    }

    pub fn cost(&self, usage: &Usage) -> f64 {
        (usage.prompt_tokens as f64 * self.input_per_million
            + usage.completion_tokens as f64 * self.output_per_million)
            / 1_000_000.0
    }

    /// Longest matching prefix wins, so `gpt-4o-mini` is not priced as `gpt-4o`.
    pub fn lookup(model: &str) -> Option<ModelPrice> {
        let model = model.to_ascii_lowercase();
        PRICES
            .iter()
            .filter(|(prefix, _)| model.starts_with(prefix))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, price)| *price)
    }
}

const PRICES: &[(&str, ModelPrice)] = &[
    ("gemini-2.5-pro", ModelPrice::new(1.25, 10.0)),
    ("gemini-2.5-flash", ModelPrice::new(0.30, 2.50)),
    ("gemini-2.5-flash-lite", ModelPrice::new(0.10, 0.40)),
    ("gemini-2.0-flash", ModelPrice::new(0.10, 0.40)),
    ("gpt-4o", ModelPrice::new(2.50, 10.0)),
    ("gpt-4o-mini", ModelPrice::new(0.15, 0.60)),
    ("gpt-4.1", ModelPrice::new(2.0, 8.0)),
    ("claude-sonnet-4", ModelPrice::new(3.0, 15.0)),
    ("claude-opus-4", ModelPrice::new(15.0, 75.0)),
    ("claude-3-5-haiku", ModelPrice::new(0.80, 4.0)),
];

/// Counters recorded for a single model call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageObservation {
    pub stage: String,
    pub model: String,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
    pub estimated_cost_usd: f64,
    /// True when the token counts were estimated locally
    #[serde(default)]
    pub estimated: bool,
}

/// Per-model totals inside a report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelTotals {
    pub calls: usize,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
    pub estimated_cost_usd: f64,
}

/// Tracks token usage across the model calls of one run
#[derive(Debug, Clone, Default)]
pub struct UsageTracker {
    observations: Vec<UsageObservation>,
    total_prompt_tokens: usize,
    total_completion_tokens: usize,
    total_tokens: usize,
    total_cost_usd: f64,
    by_model: BTreeMap<String, ModelTotals>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the counters of one call and return the stored observation
    pub fn track(&mut self, stage: &str, model: &str, usage: &Usage, estimated: bool) -> &UsageObservation {
        let cost = ModelPrice::lookup(model).map(|p| p.cost(usage)).unwrap_or(0.0);
        let total_tokens = if usage.total_tokens > 0 {
            usage.total_tokens
        } else {
            usage.prompt_tokens + usage.completion_tokens
        };

        self.total_prompt_tokens += usage.prompt_tokens;
        self.total_completion_tokens += usage.completion_tokens;
        self.total_tokens += total_tokens;
        self.total_cost_usd += cost;

        let entry = self.by_model.entry(model.to_string()).or_default();
        entry.calls += 1;
        entry.prompt_tokens += usage.prompt_tokens;
        entry.completion_tokens += usage.completion_tokens;
        entry.total_tokens += total_tokens;
        entry.estimated_cost_usd += cost;

        self.observations.push(UsageObservation {
            stage: stage.to_string(),
            model: model.to_string(),
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens,
            estimated_cost_usd: cost,
            estimated,
        });
        &self.observations[self.observations.len() - 1]
    }

    pub fn total_calls(&self) -> usize {
        self.observations.len()
    }

    pub fn total_prompt_tokens(&self) -> usize {
        self.total_prompt_tokens
    }

    pub fn total_completion_tokens(&self) -> usize {
        self.total_completion_tokens
    }

    /// Sum of the observations' totals, which may exceed prompt + completion
    /// when a backend counts tokens outside both
    pub fn total_tokens(&self) -> usize {
        self.total_tokens
    }

    pub fn estimated_cost_usd(&self) -> f64 {
        self.total_cost_usd
    }

    pub fn observations(&self) -> &[UsageObservation] {
        &self.observations
    }

    /// Snapshot the accumulator into a serializable report
    pub fn report(&self) -> UsageReport {
        UsageReport {
            generated_at: current_timestamp(),
            total_calls: self.total_calls(),
            total_prompt_tokens: self.total_prompt_tokens,
            total_completion_tokens: self.total_completion_tokens,
            total_tokens: self.total_tokens(),
            estimated_cost_usd: self.total_cost_usd,
            by_model: self.by_model.clone(),
            calls: self.observations.clone(),
        }
    }
}

/// The cumulative usage report written at the end of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageReport {
    /// Unix seconds
    pub generated_at: u64,
    pub total_calls: usize,
    pub total_prompt_tokens: usize,
    pub total_completion_tokens: usize,
    pub total_tokens: usize,
    pub estimated_cost_usd: f64,
    pub by_model: BTreeMap<String, ModelTotals>,
    pub calls: Vec<UsageObservation>,
}

impl UsageReport {
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            Error::serialization_failed(e.to_string())
                .with_operation("usage::to_json_pretty")
                .set_source(e)
        })
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| {
            Error::serialization_failed(format!("invalid usage report: {}", e))
                .with_operation("usage::from_json")
                .set_source(e)
        })
    }

    /// One line per model plus a totals line, for terminal output
    pub fn summary(&self) -> String {
        let mut lines: Vec<String> = self
            .by_model
            .iter()
            .map(|(model, t)| {
                format!(
                    "{}: {} calls, {} tokens (~${:.4})",
                    model, t.calls, t.total_tokens, t.estimated_cost_usd
                )
            })
            .collect();
        lines.push(format!(
            "total: {} calls, {} prompt + {} completion tokens (~${:.4})",
            self.total_calls, self.total_prompt_tokens, self.total_completion_tokens, self.estimated_cost_usd
        ));
        lines.join("\n")
    }
}

fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
