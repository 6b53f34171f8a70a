//! Code generator - the conjugator module and its UI module.
//!
//! Both modules are generated before anything is written, so a failed model
//! call leaves the previous files on disk untouched.

use crate::design::python_bool;
use crate::layout::OutputLayout;
use crate::text::{clean_code_block, truncate};
use crate::tracking::TrackingAgent;
use crate::types::{ArtifactRole, ArtifactSet, DesignSpec, GeneratedCode, RequirementSpec};
use verbforge_model::{LlmProvider, Result};

pub const CONJUGATOR_STAGE: &str = "codegen.conjugator";
pub const UI_STAGE: &str = "codegen.ui";

/// Longest design excerpt embedded in the module prompt
const DESIGN_EXCERPT_LEN: usize = 2000;

#[derive(Debug, Clone)]
pub struct CodeGenAgent {
    layout: OutputLayout,
}

impl CodeGenAgent {
    pub fn new(layout: OutputLayout) -> Self {
        Self { layout }
    }

    pub fn conjugator_prompt(&self, spec: &RequirementSpec, design: &DesignSpec) -> String {
        format!(
            r#"
Generate a complete Python module for a verb conjugator with these requirements:

Languages: {languages}
Tenses: {tenses}
Persons: {persons}
Handle Irregular: {irregular}

Design notes:
{design}

The code should:
1. Use mlconjug3 library for conjugations
2. Have a VerbConjugator class with a conjugate() method
3. Handle multiple languages and tenses
4. Return conjugations in a clear format
5. Include error handling
6. Be well-commented

Return ONLY the Python code, no explanations.
"#,
            languages = spec.languages.join(", "),
            tenses = spec.tenses.join(", "),
            persons = spec.persons.join(", "),
            irregular = python_bool(spec.handle_irregular),
            design = truncate(design.text.trim(), DESIGN_EXCERPT_LEN),
        )
    }

    pub fn ui_prompt(&self, spec: &RequirementSpec) -> String {
        format!(
            r#"
Generate a Gradio UI for a verb conjugator that:
1. Imports from verb_conjugator module
2. Has input fields for: verb, language, tense
3. Displays conjugation results in a clear format
4. Handles errors gracefully
5. Is user-friendly

Languages to support: {languages}
Tenses to support: {tenses}

Return ONLY the Python code for the Gradio interface.
"#,
            languages = spec.languages.join(", "),
            tenses = spec.tenses.join(", "),
        )
    }

    /// Generate both modules, then write them under the conjugator directory
    pub async fn generate<P: LlmProvider>(
        &self,
        tracking: &mut TrackingAgent<'_, P>,
        spec: &RequirementSpec,
        design: &DesignSpec,
    ) -> Result<ArtifactSet> {
        let mut artifacts = ArtifactSet::new();

        let reply = tracking
            .generate_content(CONJUGATOR_STAGE, &self.conjugator_prompt(spec, design))
            .await?;
        artifacts.insert(GeneratedCode::new(ArtifactRole::Conjugator, clean_code_block(&reply)));

        let reply = tracking.generate_content(UI_STAGE, &self.ui_prompt(spec)).await?;
        artifacts.insert(GeneratedCode::new(ArtifactRole::Ui, clean_code_block(&reply)));

        for artifact in artifacts.iter() {
            let path = self.layout.path_for(artifact.role);
            self.layout
                .write(&path, &artifact.code)
                .map_err(|e| e.with_operation("codegen::generate").with_context("role", artifact.role.as_str()))?;
        }

        tracing::info!(files = ?artifacts.filenames(), "code generated");
        Ok(artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verbforge_model::{ErrorKind, ProviderError, ScriptedProvider};

    fn spec() -> RequirementSpec {
        RequirementSpec::new(["English", "Spanish"], ["present", "past"])
            .with_irregular(false)
            .validated()
            .unwrap()
    }

    #[test]
    fn test_prompts_embed_spec() {
        let agent = CodeGenAgent::new(OutputLayout::new("."));
        let design = DesignSpec::from_text("Use a dictionary of endings.");

        let prompt = agent.conjugator_prompt(&spec(), &design);
        assert!(prompt.contains("Languages: English, Spanish\n"));
        assert!(prompt.contains("Handle Irregular: False\n"));
        assert!(prompt.contains("Use a dictionary of endings."));
        assert!(prompt.contains("first_singular, second_singular"));

        let prompt = agent.ui_prompt(&spec());
        assert!(prompt.contains("Tenses to support: present, past\n"));
    }

    #[tokio::test]
    async fn test_generates_and_writes_both_roles() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        let provider = ScriptedProvider::new("gpt-4o")
            .with_reply("```python\nclass VerbConjugator:\n    pass\n```")
            .with_reply("import gradio as gr");
        let mut tracking = TrackingAgent::new(&provider, layout.usage_report_path());

        let artifacts = CodeGenAgent::new(layout.clone())
            .generate(&mut tracking, &spec(), &DesignSpec::from_text("d"))
            .await
            .unwrap();

        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts.filenames(), vec!["verb_conjugator.py", "gradio_ui.py"]);
        assert_eq!(
            layout.read(&layout.path_for(ArtifactRole::Conjugator)).unwrap(),
            "class VerbConjugator:\n    pass"
        );
        assert_eq!(
            layout.read(&layout.path_for(ArtifactRole::Ui)).unwrap(),
            "import gradio as gr"
        );

        let stages: Vec<_> = tracking.usage().observations().iter().map(|o| o.stage.as_str()).collect();
        assert_eq!(stages, vec!["codegen.conjugator", "codegen.ui"]);
    }

    #[tokio::test]
    async fn test_ui_failure_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        let provider = ScriptedProvider::new("gpt-4o")
            .with_reply("class VerbConjugator: pass")
            .with_error(ProviderError::AuthenticationFailed);
        let mut tracking = TrackingAgent::new(&provider, layout.usage_report_path());

        let err = CodeGenAgent::new(layout.clone())
            .generate(&mut tracking, &spec(), &DesignSpec::from_text("d"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::AuthenticationFailed);
        assert_eq!(provider.prompts().len(), 2);
        assert!(!layout.path_for(ArtifactRole::Conjugator).exists());
    }
}
