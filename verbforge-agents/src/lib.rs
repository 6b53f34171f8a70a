//! # verbforge agents
//!
//! The generation pipeline, one agent per step:
//! 1. `ParserAgent` turns free-text requirements into a `RequirementSpec`
//! 2. `DesignAgent` asks the model for a design description
//! 3. `CodeGenAgent` generates the conjugator module and its UI module
//! 4. `TestAgent` generates a pytest suite for the conjugator module
//! 5. `TrackingAgent` sits under all of them, counting tokens and cost
//!
//! `Pipeline` runs the steps in order and returns the five outputs the
//! front end shows: status, code, tests, usage report, instructions.

mod codegen;
mod design;
mod instructions;
mod layout;
mod parser;
mod pipeline;
mod testgen;
mod text;
mod tracking;
mod types;

pub use codegen::CodeGenAgent;
pub use design::DesignAgent;
pub use instructions::instructions;
pub use layout::OutputLayout;
pub use parser::ParserAgent;
pub use pipeline::{Pipeline, PipelineArtifacts, PipelineConfig, PipelineOutput, Stage, StageFailure};
pub use testgen::TestAgent;
pub use text::{clean_code_block, extract_json_object, truncate};
pub use tracking::TrackingAgent;
pub use types::{
    ArtifactRole, ArtifactSet, DesignSpec, GeneratedCode, RequirementSpec, TestSuite,
    DEFAULT_PERSONS,
};

/// Sample requirement texts shown by the front end
pub const SAMPLE_REQUIREMENTS: &[&str] = &[
    "Create a verb conjugator for English and Spanish that supports present, past, and future tenses. Include irregular verb handling.",
    "Build a French verb conjugator with present, imperfect, and future tenses. Support both regular and irregular verbs.",
    "Make a simple English verb conjugator for present and past tense only.",
];
