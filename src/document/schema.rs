//! Spec document types
//!
//! Defines the data structures for deserializing YAML spec documents.

use serde::Deserialize;

use crate::model::{Table, ValidationErrorKind};

/// A spec loaded from a YAML file
#[derive(Deserialize, Debug)]
pub struct SpecDocument {
    /// Name of the spec
    pub name: String,
    /// Source file reported in results and errors (defaults to the YAML path)
    pub file: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Steps run before every scenario
    #[serde(default)]
    pub contexts: Vec<ItemDocument>,
    /// Steps run after every scenario
    #[serde(default)]
    pub teardowns: Vec<ItemDocument>,
    pub scenarios: Vec<ScenarioDocument>,
}

#[derive(Deserialize, Debug)]
pub struct ScenarioDocument {
    pub heading: String,
    /// Line of the heading in the source file
    #[serde(default)]
    pub line: usize,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub items: Vec<ItemDocument>,
    /// Errors found for the scenario as a whole
    #[serde(default)]
    pub errors: Vec<ErrorDocument>,
}

/// One entry of a scenario, context or concept body
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum ItemDocument {
    /// A concept invocation and the steps it expands to
    Concept {
        concept: String,
        /// Text with arguments as placeholders (defaults to `concept`)
        pattern: Option<String>,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        line: usize,
        #[serde(default)]
        steps: Vec<ItemDocument>,
        error: Option<ErrorDocument>,
    },
    Step {
        step: String,
        /// Text with arguments as placeholders (defaults to `step`)
        pattern: Option<String>,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        line: usize,
        /// Validation error found for this step
        error: Option<ErrorDocument>,
    },
    Comment {
        comment: String,
    },
    Table {
        table: Table,
    },
}

/// A validation error recorded against a step or scenario
#[derive(Deserialize, Debug)]
pub struct ErrorDocument {
    pub kind: ValidationErrorKind,
    pub message: Option<String>,
}

impl ErrorDocument {
    pub fn message(&self) -> String {
        self.message.clone().unwrap_or_else(|| default_message(self.kind).to_string())
    }
}

fn default_message(kind: ValidationErrorKind) -> &'static str {
    match kind {
        ValidationErrorKind::StepImplementationNotFound => "Step implementation not found",
        ValidationErrorKind::ParamsCountMismatch => "Parameter count mismatch",
        ValidationErrorKind::DuplicateStepImplementation => "Duplicate step implementation",
        ValidationErrorKind::InvalidScenario => "Invalid scenario",
        ValidationErrorKind::DataStoreInitFailed => "Failed to initialize scenario datastore",
    }
}
