//! Test generator - a pytest suite for the generated conjugator module

use crate::design::python_bool;
use crate::layout::OutputLayout;
use crate::text::{clean_code_block, truncate};
use crate::tracking::TrackingAgent;
use crate::types::{ArtifactRole, ArtifactSet, RequirementSpec, TestSuite};
use verbforge_model::{LlmProvider, Result};

pub const STAGE: &str = "tests";

const PYTEST_IMPORT: &str = "import pytest";
const SOURCE_EXCERPT_LEN: usize = 4000;

#[derive(Debug, Clone)]
pub struct TestAgent {
    layout: OutputLayout,
}

impl TestAgent {
    pub fn new(layout: OutputLayout) -> Self {
        Self { layout }
    }

    pub fn build_prompt(&self, spec: &RequirementSpec, conjugator_source: &str) -> String {
        format!(
            r#"
Generate comprehensive pytest test cases for a verb conjugator application.

Requirements:
- Languages: {languages}
- Tenses: {tenses}
- Test irregular verbs: {irregular}

Module under test (verb_conjugator.py):
```python
{source}
```

Generate at least 12 test cases that:
1. Test regular verb conjugations
2. Test irregular verb conjugations (if applicable)
3. Test multiple languages
4. Test multiple tenses
5. Test error handling (invalid inputs)
6. Test edge cases

The tests should:
- Use pytest framework
- Import from verb_conjugator module
- Be well-documented
- Have clear assertions
- At least 80% should pass

Return ONLY the Python test code.
"#,
            languages = spec.languages.join(", "),
            tenses = spec.tenses.join(", "),
            irregular = python_bool(spec.handle_irregular),
            source = truncate(conjugator_source, SOURCE_EXCERPT_LEN),
        )
    }

    /// Generate the test suite and write it to the tests directory.
    ///
    /// Fails with `ArtifactNotFound` before calling the model when
    /// `artifacts` has no conjugator module.
    pub async fn generate_tests<P: LlmProvider>(
        &self,
        tracking: &mut TrackingAgent<'_, P>,
        spec: &RequirementSpec,
        artifacts: &ArtifactSet,
    ) -> Result<TestSuite> {
        let conjugator = artifacts
            .require(ArtifactRole::Conjugator)
            .map_err(|e| e.with_operation("testgen::generate_tests"))?;

        let reply = tracking
            .generate_content(STAGE, &self.build_prompt(spec, &conjugator.code))
            .await?;
        let code = ensure_pytest_import(clean_code_block(&reply));

        let path = self.layout.path_for(ArtifactRole::Tests);
        self.layout
            .write(&path, &code)
            .map_err(|e| e.with_operation("testgen::generate_tests"))?;

        tracing::info!(path = %path.display(), "tests generated");
        Ok(TestSuite {
            filename: ArtifactRole::Tests.filename().to_string(),
            code,
        })
    }
}

fn ensure_pytest_import(code: String) -> String {
    if code.contains(PYTEST_IMPORT) {
        code
    } else {
        format!("{}\n{}", PYTEST_IMPORT, code)
    }
}
