//! Pipeline orchestrator.
//!
//! Runs parse, design, codegen, tests and report strictly in order against
//! one provider. Every run gets its own `TrackingAgent`, so usage never
//! carries over from a previous run.
//!
//! `run_detailed` is the typed form: a failure names its stage and keeps
//! whatever the earlier stages produced. `run` flattens that into the five
//! display strings.

use crate::codegen::CodeGenAgent;
use crate::design::DesignAgent;
use crate::instructions::instructions;
use crate::layout::OutputLayout;
use crate::parser::ParserAgent;
use crate::testgen::TestAgent;
use crate::tracking::TrackingAgent;
use crate::types::{ArtifactRole, ArtifactSet, DesignSpec, RequirementSpec, TestSuite};
use std::fmt;
use verbforge_model::{Error, LlmProvider, Result, RetryConfig, UsageReport, UsageTracker};

/// Pipeline configuration
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Where generated files and the usage report are written
    pub layout: OutputLayout,
    pub retry: RetryConfig,
    /// Overrides the provider's default model
    pub model: Option<String>,
    pub temperature: Option<f32>,
}

impl PipelineConfig {
    pub fn new(layout: OutputLayout) -> Self {
        Self {
            layout,
            ..Self::default()
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Parse,
    Design,
    CodeGen,
    Tests,
    Report,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Parse => "parse",
            Stage::Design => "design",
            Stage::CodeGen => "codegen",
            Stage::Tests => "tests",
            Stage::Report => "report",
        }
    }

    /// Status line appended when the stage starts
    pub fn status_line(&self) -> &'static str {
        match self {
            Stage::Parse => "📝 Parsing requirements...",
            Stage::Design => "🎨 Creating design...",
            Stage::CodeGen => "💻 Generating code...",
            Stage::Tests => "🧪 Generating tests...",
            Stage::Report => "📊 Saving usage report...",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const COMPLETE_LINE: &str = "✅ Generation complete!";

/// Everything a successful run produced
#[derive(Debug, Clone)]
pub struct PipelineArtifacts {
    pub status: Vec<String>,
    pub spec: RequirementSpec,
    pub design: DesignSpec,
    pub code: ArtifactSet,
    pub tests: TestSuite,
    pub usage: UsageReport,
    /// The usage report exactly as written to disk
    pub usage_json: String,
    /// Run instructions for the files under the configured output root
    pub instructions: String,
}

impl PipelineArtifacts {
    /// Both modules under filename headers, conjugator first
    pub fn code_bundle(&self) -> String {
        let source = |role: ArtifactRole| self.code.get(role).map(|c| c.code.as_str()).unwrap_or_default();
        format!(
            "# {}\n{}\n\n# {}\n{}",
            ArtifactRole::Conjugator.filename(),
            source(ArtifactRole::Conjugator),
            ArtifactRole::Ui.filename(),
            source(ArtifactRole::Ui),
        )
    }

    pub fn output(&self) -> PipelineOutput {
        PipelineOutput {
            status: self.status.join("\n"),
            code: self.code_bundle(),
            tests: self.tests.code.clone(),
            usage_report: self.usage_json.clone(),
            instructions: self.instructions.clone(),
        }
    }
}

/// A run that stopped at `stage`.
///
/// Outputs of the stages before it are kept; `usage` covers every model call
/// made so far, including the failed stage's.
#[derive(Debug)]
pub struct StageFailure {
    pub stage: Stage,
    pub error: Error,
    pub status: Vec<String>,
    pub spec: Option<RequirementSpec>,
    pub design: Option<DesignSpec>,
    pub code: Option<ArtifactSet>,
    pub usage: UsageReport,
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} stage failed: {}", self.stage, self.error)
    }
}

impl std::error::Error for StageFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// The five strings the front end displays
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineOutput {
    pub status: String,
    pub code: String,
    pub tests: String,
    pub usage_report: String,
    pub instructions: String,
}

impl PipelineOutput {
    /// Only a status line, every payload empty
    pub fn failed(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        !self.code.is_empty()
    }

    pub fn into_tuple(self) -> (String, String, String, String, String) {
        (self.status, self.code, self.tests, self.usage_report, self.instructions)
    }
}

/// Status log and partial outputs of a run in progress
#[derive(Default)]
struct Progress {
    status: Vec<String>,
    spec: Option<RequirementSpec>,
    design: Option<DesignSpec>,
    code: Option<ArtifactSet>,
}

impl Progress {
    fn begin(&mut self, stage: Stage) {
        tracing::info!(stage = stage.as_str(), "stage started");
        self.status.push(stage.status_line().to_string());
    }

    fn check<T>(&mut self, stage: Stage, result: Result<T>, usage: &UsageTracker) -> std::result::Result<T, StageFailure> {
        result.map_err(|error| {
            tracing::error!(stage = stage.as_str(), error = %error, "stage failed");
            StageFailure {
                stage,
                error,
                status: std::mem::take(&mut self.status),
                spec: self.spec.take(),
                design: self.design.take(),
                code: self.code.take(),
                usage: usage.report(),
            }
        })
    }
}

pub struct Pipeline<'p, P: LlmProvider> {
    provider: &'p P,
    config: PipelineConfig,
    parser: ParserAgent,
    designer: DesignAgent,
    codegen: CodeGenAgent,
    tester: TestAgent,
}

impl<'p, P: LlmProvider> Pipeline<'p, P> {
    pub fn new(provider: &'p P, config: PipelineConfig) -> Self {
        Self {
            provider,
            parser: ParserAgent::new(),
            designer: DesignAgent::new(),
            codegen: CodeGenAgent::new(config.layout.clone()),
            tester: TestAgent::new(config.layout.clone()),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn tracking(&self) -> TrackingAgent<'p, P> {
        let mut tracking = TrackingAgent::new(self.provider, self.config.layout.usage_report_path())
            .with_retry(self.config.retry.clone());
        if let Some(model) = &self.config.model {
            tracking = tracking.with_model(model.clone());
        }
        if let Some(t) = self.config.temperature {
            tracking = tracking.with_temperature(t);
        }
        tracking
    }

    /// Run every stage, stopping at the first failure
    pub async fn run_detailed(&self, requirements: &str) -> std::result::Result<PipelineArtifacts, StageFailure> {
        let mut tracking = self.tracking();
        let mut progress = Progress::default();
        tracing::info!(provider = self.provider.name(), model = tracking.model(), "pipeline started");

        progress.begin(Stage::Parse);
        let spec = progress.check(
            Stage::Parse,
            self.parser.parse(&mut tracking, requirements).await,
            tracking.usage(),
        )?;
        progress.spec = Some(spec.clone());

        progress.begin(Stage::Design);
        let design = progress.check(
            Stage::Design,
            self.designer.design(&mut tracking, &spec).await,
            tracking.usage(),
        )?;
        progress.design = Some(design.clone());

        progress.begin(Stage::CodeGen);
        let code = progress.check(
            Stage::CodeGen,
            self.codegen.generate(&mut tracking, &spec, &design).await,
            tracking.usage(),
        )?;
        progress.code = Some(code.clone());

        progress.begin(Stage::Tests);
        let tests = progress.check(
            Stage::Tests,
            self.tester.generate_tests(&mut tracking, &spec, &code).await,
            tracking.usage(),
        )?;

        progress.begin(Stage::Report);
        let layout = &self.config.layout;
        let saved = tracking
            .save_usage_report()
            .and_then(|usage| Ok((layout.read(&layout.usage_report_path())?, usage)));
        let (usage_json, usage) = progress.check(Stage::Report, saved, tracking.usage())?;

        let mut status = std::mem::take(&mut progress.status);
        status.push(String::new());
        status.push(COMPLETE_LINE.to_string());

        tracing::info!(
            calls = usage.total_calls,
            tokens = usage.total_tokens,
            cost_usd = usage.estimated_cost_usd,
            "pipeline complete"
        );

        Ok(PipelineArtifacts {
            instructions: instructions(&spec, layout),
            status,
            spec,
            design,
            code,
            tests,
            usage,
            usage_json,
        })
    }

    /// Run every stage and flatten the outcome into the five display strings.
    ///
    /// On failure only `status` is set, naming the failed stage.
    pub async fn run(&self, requirements: &str) -> PipelineOutput {
        match self.run_detailed(requirements).await {
            Ok(artifacts) => artifacts.output(),
            Err(failure) => PipelineOutput::failed(format!("❌ Error: {}", failure)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use verbforge_model::{ErrorKind, ProviderError, ScriptedProvider, Usage};

    const SPEC_REPLY: &str = r#"{"languages": ["English", "Spanish"], "tenses": ["present", "past"], "persons": [], "handle_irregular": true}"#;

    fn scripted(tag: &str) -> ScriptedProvider {
        ScriptedProvider::new("gemini-2.5-flash")
            .with_usage(Usage::new(100, 50))
            .with_reply(SPEC_REPLY)
            .with_reply(format!("{{\"modules\": [\"{}\"]}}", tag))
            .with_reply(format!("```python\n# conjugator {}\nclass VerbConjugator:\n    pass\n```", tag))
            .with_reply(format!("# ui {}\nimport gradio as gr", tag))
            .with_reply(format!("def test_{}():\n    assert True", tag))
    }

    fn config(layout: &OutputLayout) -> PipelineConfig {
        PipelineConfig::new(layout.clone()).with_retry(
            RetryConfig::default()
                .with_initial_delay(Duration::ZERO)
                .with_max_delay(Duration::ZERO),
        )
    }

    #[tokio::test]
    async fn test_successful_run_produces_five_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        let provider = scripted("one");

        let output = Pipeline::new(&provider, config(&layout))
            .run(crate::SAMPLE_REQUIREMENTS[0])
            .await;

        assert!(output.is_success());
        assert!(output.status.starts_with("📝 Parsing requirements..."));
        assert!(output.status.ends_with("\n\n✅ Generation complete!"));
        assert_eq!(output.status.lines().filter(|l| l.ends_with("...")).count(), 5);
        assert_eq!(
            output.code,
            "# verb_conjugator.py\n# conjugator one\nclass VerbConjugator:\n    pass\n\n# gradio_ui.py\n# ui one\nimport gradio as gr"
        );
        assert!(output.tests.starts_with("import pytest\n"));
        assert!(output.instructions.contains("- Supported Languages: English, Spanish\n"));
        assert!(output
            .instructions
            .contains(&format!("cd {}\n", layout.conjugator_dir().display())));

        let report = UsageReport::from_json(&output.usage_report).unwrap();
        assert_eq!(report.total_calls, 5);
        assert_eq!(report.total_tokens, 750);
        let stages: Vec<_> = report.calls.iter().map(|c| c.stage.as_str()).collect();
        assert_eq!(stages, vec!["parse", "design", "codegen.conjugator", "codegen.ui", "tests"]);
        assert_eq!(provider.remaining(), 0);
    }

    #[tokio::test]
    async fn test_run_detailed_keeps_typed_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        let provider = scripted("typed");

        let artifacts = Pipeline::new(&provider, config(&layout))
            .run_detailed("English and Spanish")
            .await
            .unwrap();

        assert_eq!(artifacts.spec.persons.len(), 6);
        assert!(artifacts.design.structured.is_some());
        assert_eq!(artifacts.code.len(), 2);
        assert_eq!(artifacts.tests.filename, "test_conjugator.py");
        assert_eq!(
            artifacts.usage_json,
            std::fs::read_to_string(layout.usage_report_path()).unwrap()
        );
    }

    #[tokio::test]
    async fn test_second_run_overwrites_files_and_resets_usage() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());

        let first = scripted("first-run-with-a-longer-tag");
        Pipeline::new(&first, config(&layout)).run("req").await;
        let second = scripted("2");
        let output = Pipeline::new(&second, config(&layout)).run("req").await;
        assert!(output.is_success());

        for role in [ArtifactRole::Conjugator, ArtifactRole::Ui, ArtifactRole::Tests] {
            let content = layout.read(&layout.path_for(role)).unwrap();
            assert!(!content.contains("first-run"), "{} kept old content", role);
            assert!(content.contains('2'));
        }
        let report = UsageReport::from_json(&layout.read(&layout.usage_report_path()).unwrap()).unwrap();
        assert_eq!(report.total_calls, 5);
    }

    #[tokio::test]
    async fn test_failure_leaves_only_status() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        let provider = ScriptedProvider::new("gpt-4o")
            .with_reply(SPEC_REPLY)
            .with_error(ProviderError::AuthenticationFailed);

        let output = Pipeline::new(&provider, config(&layout)).run("req").await;

        assert!(output.status.starts_with("❌ Error: design stage failed"));
        assert!(!output.is_success());
        let (_, code, tests, usage, instructions) = output.into_tuple();
        assert!(code.is_empty() && tests.is_empty() && usage.is_empty() && instructions.is_empty());
        assert!(!layout.usage_report_path().exists());
    }

    #[tokio::test]
    async fn test_empty_requirements_fail_at_parse() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        let provider = ScriptedProvider::new("gpt-4o");

        let failure = Pipeline::new(&provider, config(&layout))
            .run_detailed("  ")
            .await
            .unwrap_err();

        assert_eq!(failure.stage, Stage::Parse);
        assert_eq!(failure.error.kind(), ErrorKind::InvalidArgument);
        assert_eq!(failure.status, vec![Stage::Parse.status_line()]);
        assert!(failure.spec.is_none());
        assert_eq!(failure.usage.total_calls, 0);
    }

    #[tokio::test]
    async fn test_failure_preserves_partial_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        let provider = ScriptedProvider::new("gpt-4o")
            .with_reply(SPEC_REPLY)
            .with_reply("plain design")
            .with_reply("class VerbConjugator: pass")
            .with_reply("import gradio")
            .with_error(ProviderError::Api { status: 400, message: "bad request".into() });

        let failure = Pipeline::new(&provider, config(&layout))
            .run_detailed("req")
            .await
            .unwrap_err();

        assert_eq!(failure.stage, Stage::Tests);
        assert_eq!(failure.error.kind(), ErrorKind::InferenceFailed);
        assert_eq!(failure.status.len(), 4);
        assert_eq!(failure.design.unwrap().text, "plain design");
        assert_eq!(failure.code.unwrap().len(), 2);
        assert_eq!(failure.usage.total_calls, 4);
        assert_eq!(provider.prompts().len(), 5);
        assert!(layout.path_for(ArtifactRole::Ui).exists());
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        let mut provider = ScriptedProvider::new("gpt-4o");
        for _ in 0..3 {
            provider = provider.with_error(ProviderError::Api { status: 503, message: "overloaded".into() });
        }
        let config = config(&layout).with_retry(
            RetryConfig::default()
                .with_max_retries(2)
                .with_initial_delay(Duration::ZERO)
                .with_max_delay(Duration::ZERO),
        );

        let failure = Pipeline::new(&provider, config).run_detailed("req").await.unwrap_err();

        assert_eq!(failure.stage, Stage::Parse);
        assert_eq!(failure.error.kind(), ErrorKind::ProviderUnavailable);
        assert_eq!(failure.error.context_value("attempts"), Some("3"));
        assert_eq!(provider.prompts().len(), 3);
    }

    #[tokio::test]
    async fn test_model_override_reaches_provider() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        let provider = scripted("m");

        let artifacts = Pipeline::new(&provider, config(&layout).with_model("gpt-4o-mini"))
            .run_detailed("req")
            .await
            .unwrap();

        assert!(artifacts.usage.calls.iter().all(|c| c.model == "gpt-4o-mini"));
        assert!(artifacts.usage.by_model.contains_key("gpt-4o-mini"));
    }
}
