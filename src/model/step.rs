//! Parsed specification nodes: steps, scenarios and the items around them

use serde::{Deserialize, Serialize};

use super::info::SpecInfo;
use super::validation::ScenarioKey;

/// A step of a parsed specification
///
/// `parameterized_text` identifies the step: implementations and validation
/// errors are matched on it, never on the step's position in the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Text as written in the spec, arguments included
    pub actual_text: String,
    /// Text with arguments replaced by placeholders
    pub parameterized_text: String,
    pub line_no: usize,
    #[serde(default)]
    pub args: Vec<String>,
    /// Set for concept invocations, even when the concept has no steps
    #[serde(default)]
    pub is_concept: bool,
    #[serde(default)]
    pub concept_steps: Vec<Step>,
}

impl Step {
    /// A plain step
    pub fn new(actual_text: impl Into<String>, parameterized_text: impl Into<String>, line_no: usize) -> Self {
        Self {
            actual_text: actual_text.into(),
            parameterized_text: parameterized_text.into(),
            line_no,
            args: Vec::new(),
            is_concept: false,
            concept_steps: Vec::new(),
        }
    }

    /// A concept invocation expanding into `steps`
    pub fn concept(
        actual_text: impl Into<String>,
        parameterized_text: impl Into<String>,
        line_no: usize,
        steps: Vec<Step>,
    ) -> Self {
        Self {
            is_concept: true,
            concept_steps: steps,
            ..Self::new(actual_text, parameterized_text, line_no)
        }
    }

    /// Attach argument values
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
}

/// A data table attached to a spec or scenario
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
}

/// One entry of a scenario body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    /// A step or a concept invocation
    Step(Step),
    Comment(String),
    Table(Table),
}

impl Item {
    pub fn as_step(&self) -> Option<&Step> {
        match self {
            Self::Step(step) => Some(step),
            _ => None,
        }
    }
}

/// Scenario heading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub text: String,
    pub line_no: usize,
}

/// A scenario: heading plus body items
///
/// Contexts and teardowns are not part of the scenario; the caller passes
/// them alongside it at execution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub heading: Heading,
    pub items: Vec<Item>,
    pub tags: Vec<String>,
}

impl Scenario {
    pub fn new(heading: impl Into<String>, line_no: usize, items: Vec<Item>) -> Self {
        Self {
            heading: Heading {
                text: heading.into(),
                line_no,
            },
            items,
            tags: Vec::new(),
        }
    }

    /// Body steps in order, comments and tables left out
    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.items.iter().filter_map(Item::as_step)
    }

    pub fn has_steps(&self) -> bool {
        self.steps().next().is_some()
    }

    /// Key under which validation errors for this scenario are filed
    pub fn key(&self) -> ScenarioKey {
        ScenarioKey {
            heading: self.heading.text.clone(),
            line_no: self.heading.line_no,
        }
    }
}

/// A parsed spec file
///
/// Contexts run before and teardowns after every scenario's body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Spec {
    pub name: String,
    pub file_name: String,
    pub tags: Vec<String>,
    pub contexts: Vec<Step>,
    pub teardowns: Vec<Step>,
    pub scenarios: Vec<Scenario>,
}

impl Spec {
    pub fn info(&self) -> SpecInfo {
        SpecInfo {
            name: self.name.clone(),
            file_name: self.file_name.clone(),
            is_failed: false,
            tags: self.tags.clone(),
        }
    }
}
