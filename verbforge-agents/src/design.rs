//! Design planner

use crate::text::clean_code_block;
use crate::tracking::TrackingAgent;
use crate::types::{DesignSpec, RequirementSpec};
use verbforge_model::{LlmProvider, Result};

pub const STAGE: &str = "design";

#[derive(Debug, Clone, Copy, Default)]
pub struct DesignAgent;

impl DesignAgent {
    pub fn new() -> Self {
        Self
    }

    pub fn build_prompt(&self, spec: &RequirementSpec) -> String {
        format!(
            r#"
Design a small Python verb conjugator application with these requirements:

Languages: {languages}
Tenses: {tenses}
Persons: {persons}
Handle Irregular: {irregular}

Describe:
1. The modules and their responsibilities (verb_conjugator.py, gradio_ui.py)
2. The VerbConjugator class and its public methods
3. How languages and tenses are selected
4. How irregular verbs and invalid input are handled
5. What the user interface shows

Return the design as a JSON object with keys "modules", "classes" and "notes".
"#,
            languages = spec.languages.join(", "),
            tenses = spec.tenses.join(", "),
            persons = spec.persons.join(", "),
            irregular = python_bool(spec.handle_irregular),
        )
    }

    /// Ask the model for a design; the text is kept as returned
    pub async fn design<P: LlmProvider>(
        &self,
        tracking: &mut TrackingAgent<'_, P>,
        spec: &RequirementSpec,
    ) -> Result<DesignSpec> {
        let reply = tracking.generate_content(STAGE, &self.build_prompt(spec)).await?;
        let design = DesignSpec::from_text(clean_code_block(&reply));
        tracing::debug!(
            structured = design.structured.is_some(),
            chars = design.text.len(),
            "design created"
        );
        Ok(design)
    }
}

/// Booleans are rendered the way the generated Python reads them
pub(crate) fn python_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verbforge_model::{ErrorKind, ScriptedProvider};

    fn spec() -> RequirementSpec {
        RequirementSpec::new(["French"], ["present", "imperfect"])
            .validated()
            .unwrap()
    }

    #[test]
    fn test_prompt_lists_spec_fields() {
        let prompt = DesignAgent::new().build_prompt(&spec());
        assert!(prompt.contains("Languages: French\n"));
        assert!(prompt.contains("Tenses: present, imperfect\n"));
        assert!(prompt.contains("Handle Irregular: True\n"));
    }

    #[tokio::test]
    async fn test_structured_design() {
        let dir = tempfile::tempdir().unwrap();
        let provider = ScriptedProvider::new("gpt-4o")
            .with_reply("```json\n{\"modules\": [\"verb_conjugator\"], \"classes\": [], \"notes\": \"\"}\n```");
        let mut tracking = TrackingAgent::new(&provider, dir.path().join("r.json"));

        let design = DesignAgent::new().design(&mut tracking, &spec()).await.unwrap();

        assert!(design.text.starts_with('{'));
        assert_eq!(design.structured.unwrap()["modules"][0], "verb_conjugator");
    }

    #[tokio::test]
    async fn test_free_form_design_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let provider = ScriptedProvider::new("gpt-4o").with_reply("One class, two modules.");
        let mut tracking = TrackingAgent::new(&provider, dir.path().join("r.json"));

        let design = DesignAgent::new().design(&mut tracking, &spec()).await.unwrap();

        assert_eq!(design.text, "One class, two modules.");
        assert!(design.structured.is_none());
    }

    #[tokio::test]
    async fn test_empty_design_reply() {
        let dir = tempfile::tempdir().unwrap();
        let provider = ScriptedProvider::new("gpt-4o").with_reply("");
        let mut tracking = TrackingAgent::new(&provider, dir.path().join("r.json"));

        let err = DesignAgent::new().design(&mut tracking, &spec()).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::EmptyResponse);
        assert_eq!(err.context_value("stage"), Some("design"));
    }
}
