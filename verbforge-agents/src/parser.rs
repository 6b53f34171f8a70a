//! Requirement parser - free text to `RequirementSpec`

use crate::text::{extract_json_object, truncate};
use crate::tracking::TrackingAgent;
use crate::types::RequirementSpec;
use verbforge_model::{Error, LlmProvider, Result};

/// Usage stage name for the parse call
pub const STAGE: &str = "parse";

#[derive(Debug, Clone, Copy, Default)]
pub struct ParserAgent;

impl ParserAgent {
    pub fn new() -> Self {
        Self
    }

    /// The prompt sent to the model for `requirements`
    pub fn build_prompt(&self, requirements: &str) -> String {
        format!(
            r#"
Extract the verb conjugator requirements from the text below.

Requirements:
{requirements}

Return a single JSON object with exactly these keys:
- "languages": list of language names, e.g. ["English", "Spanish"]
- "tenses": list of tense names, e.g. ["present", "past", "future"]
- "persons": list of grammatical persons, e.g. ["first_singular", "third_plural"]; use [] if the text does not say
- "handle_irregular": true if irregular verbs must be supported, otherwise false

Return ONLY the JSON object, no explanations.
"#,
            requirements = requirements.trim()
        )
    }

    /// Ask the model to structure `requirements` and validate what comes back
    pub async fn parse<P: LlmProvider>(
        &self,
        tracking: &mut TrackingAgent<'_, P>,
        requirements: &str,
    ) -> Result<RequirementSpec> {
        if requirements.trim().is_empty() {
            return Err(Error::invalid_argument("requirements text is empty")
                .with_operation("parser::parse"));
        }

        let reply = tracking
            .generate_content(STAGE, &self.build_prompt(requirements))
            .await?;
        let json = extract_json_object(&reply);

        let spec: RequirementSpec = serde_json::from_str(&json).map_err(|e| {
            Error::parse_failed("model reply is not a requirement spec")
                .with_operation("parser::parse")
                .with_context("reply", truncate(&json, 200))
                .set_source(e)
        })?;

        let spec = spec
            .validated()
            .map_err(|e| e.with_operation("parser::parse"))?;
        tracing::debug!(
            languages = ?spec.languages,
            tenses = ?spec.tenses,
            handle_irregular = spec.handle_irregular,
            "requirements parsed"
        );
        Ok(spec)
    }
}
