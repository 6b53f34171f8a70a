//! Data passed between the pipeline stages

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use verbforge_model::{Error, Result};

/// Persons used when the requirements do not name any
pub const DEFAULT_PERSONS: [&str; 6] = [
    "first_singular",
    "second_singular",
    "third_singular",
    "first_plural",
    "second_plural",
    "third_plural",
];

/// Structured requirements extracted from free text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementSpec {
    pub languages: Vec<String>,
    pub tenses: Vec<String>,
    #[serde(default, deserialize_with = "null_as_no_persons")]
    pub persons: Vec<String>,
    #[serde(default = "default_handle_irregular", deserialize_with = "null_as_irregular_default")]
    pub handle_irregular: bool,
}

fn default_handle_irregular() -> bool {
    true
}

// Models often send `null` for fields they could not fill in
fn null_as_no_persons<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Vec<String>, D::Error> {
    Ok(Option::<Vec<String>>::deserialize(d)?.unwrap_or_default())
}

fn null_as_irregular_default<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(d)?.unwrap_or_else(default_handle_irregular))
}

impl RequirementSpec {
    pub fn new<L, T>(languages: L, tenses: T) -> Self
    where
        L: IntoIterator,
        L::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self {
            languages: languages.into_iter().map(Into::into).collect(),
            tenses: tenses.into_iter().map(Into::into).collect(),
            persons: Vec::new(),
            handle_irregular: true,
        }
    }

    pub fn with_persons<I>(mut self, persons: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.persons = persons.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_irregular(mut self, handle_irregular: bool) -> Self {
        self.handle_irregular = handle_irregular;
        self
    }

    /// Normalize and check the spec.
    ///
    /// Entries are trimmed, blanks and case-insensitive duplicates dropped.
    /// Languages and tenses must be non-empty afterwards; empty persons fall
    /// back to `DEFAULT_PERSONS`.
    pub fn validated(self) -> Result<Self> {
        let languages = normalize(self.languages);
        let tenses = normalize(self.tenses);
        let mut persons = normalize(self.persons);

        if languages.is_empty() {
            return Err(Error::spec_invalid("requirements name no languages")
                .with_context("field", "languages"));
        }
        if tenses.is_empty() {
            return Err(Error::spec_invalid("requirements name no tenses")
                .with_context("field", "tenses"));
        }
        if persons.is_empty() {
            persons = DEFAULT_PERSONS.iter().map(|p| p.to_string()).collect();
        }

        Ok(Self {
            languages,
            tenses,
            persons,
            handle_irregular: self.handle_irregular,
        })
    }
}

fn normalize(items: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut out = Vec::new();
    for item in items {
        let item = item.trim().to_string();
        if item.is_empty() {
            continue;
        }
        let key = item.to_lowercase();
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        out.push(item);
    }
    out
}

/// Design description produced by the planner
#[derive(Debug, Clone, PartialEq)]
pub struct DesignSpec {
    /// Text as returned by the model, fences stripped
    pub text: String,
    /// Parsed value when the text is valid JSON
    pub structured: Option<serde_json::Value>,
}

impl DesignSpec {
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let structured = serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .filter(|v| v.is_object() || v.is_array());
        Self { text, structured }
    }
}

/// What a generated artifact is for; each role has a fixed filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactRole {
    /// The primary conjugator module
    Conjugator,
    Ui,
    Tests,
}

impl ArtifactRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactRole::Conjugator => "conjugator",
            ArtifactRole::Ui => "ui",
            ArtifactRole::Tests => "tests",
        }
    }

    pub fn filename(&self) -> &'static str {
        match self {
            ArtifactRole::Conjugator => "verb_conjugator.py",
            ArtifactRole::Ui => "gradio_ui.py",
            ArtifactRole::Tests => "test_conjugator.py",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ArtifactRole::Conjugator => "Main verb conjugator module",
            ArtifactRole::Ui => "Gradio user interface",
            ArtifactRole::Tests => "Pytest suite for the conjugator module",
        }
    }

    pub fn dependencies(&self) -> &'static [&'static str] {
        match self {
            ArtifactRole::Conjugator => &["mlconjug3"],
            ArtifactRole::Ui => &["gradio", "verb_conjugator"],
            ArtifactRole::Tests => &["pytest", "verb_conjugator"],
        }
    }
}

impl std::fmt::Display for ArtifactRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One generated source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedCode {
    pub role: ArtifactRole,
    pub filename: String,
    pub code: String,
    pub description: String,
    pub dependencies: Vec<String>,
}

impl GeneratedCode {
    pub fn new(role: ArtifactRole, code: impl Into<String>) -> Self {
        Self {
            role,
            filename: role.filename().to_string(),
            code: code.into(),
            description: role.description().to_string(),
            dependencies: role.dependencies().iter().map(|d| d.to_string()).collect(),
        }
    }
}

/// Generated artifacts keyed by role
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactSet {
    artifacts: BTreeMap<ArtifactRole, GeneratedCode>,
}

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an artifact, returning the one it replaced for the same role
    pub fn insert(&mut self, code: GeneratedCode) -> Option<GeneratedCode> {
        self.artifacts.insert(code.role, code)
    }

    pub fn get(&self, role: ArtifactRole) -> Option<&GeneratedCode> {
        self.artifacts.get(&role)
    }

    /// Like `get`, but a missing role is an `ArtifactNotFound` error
    pub fn require(&self, role: ArtifactRole) -> Result<&GeneratedCode> {
        self.get(role).ok_or_else(|| {
            Error::artifact_not_found(role.as_str()).with_context("filename", role.filename())
        })
    }

    /// Artifacts in role order
    pub fn iter(&self) -> impl Iterator<Item = &GeneratedCode> {
        self.artifacts.values()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn filenames(&self) -> Vec<&str> {
        self.iter().map(|a| a.filename.as_str()).collect()
    }
}

/// Generated test suite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSuite {
    pub filename: String,
    pub code: String,
}
