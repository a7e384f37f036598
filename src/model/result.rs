//! Result tree
//!
//! Mirrors the step tree. It is compiled once from the spec items before
//! execution, then each executable node gets its result attached exactly
//! once, after the node has run.

use serde::{Deserialize, Serialize};

use super::step::{Item, Scenario, Step, Table};
use crate::runner::protocol::ExecutionResult;

/// Detail of a failed lifecycle hook
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookFailure {
    pub error_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}

impl From<&ExecutionResult> for HookFailure {
    fn from(result: &ExecutionResult) -> Self {
        Self {
            error_message: result.error_text().to_string(),
            stack_trace: result.stack_trace.clone(),
            screenshot: result.screenshot.clone(),
        }
    }
}

/// Whether an executed node failed and whether its siblings may still run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Outcome {
    pub failed: bool,
    pub recoverable: bool,
}

impl Outcome {
    pub const PASSED: Outcome = Outcome {
        failed: false,
        recoverable: false,
    };

    pub fn of(result: &ExecutionResult) -> Self {
        Self {
            failed: result.failed,
            recoverable: result.recoverable_error,
        }
    }

    /// The walk at this level must stop
    pub fn halts(&self) -> bool {
        self.failed && !self.recoverable
    }
}

/// Execution status attached to a step node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepExecutionResult {
    pub execution_result: ExecutionResult,
    #[serde(default)]
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_hook_failure: Option<HookFailure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_hook_failure: Option<HookFailure>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub text: String,
    /// `None` until the step has run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution: Option<StepExecutionResult>,
}

impl StepResult {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            execution: None,
        }
    }

    pub fn executed(&self) -> bool {
        self.execution.is_some()
    }

    pub fn outcome(&self) -> Outcome {
        self.execution
            .as_ref()
            .map(|e| Outcome::of(&e.execution_result))
            .unwrap_or(Outcome::PASSED)
    }

    pub fn execution_time(&self) -> u64 {
        self.execution
            .as_ref()
            .map_or(0, |e| e.execution_result.execution_time)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptResult {
    pub text: String,
    pub items: Vec<ResultItem>,
    /// Aggregated from the children, `None` until the concept has run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_result: Option<ExecutionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_hook_failure: Option<HookFailure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_hook_failure: Option<HookFailure>,
}

impl ConceptResult {
    pub fn new(text: impl Into<String>, items: Vec<ResultItem>) -> Self {
        Self {
            text: text.into(),
            items,
            ..Self::default()
        }
    }

    /// Derive the concept's own status from its children and hooks
    ///
    /// Failed if any child or hook failed. Recoverability comes from the last
    /// failing child, which is the one that stopped the walk if anything
    /// did. Hook failures are never recoverable. No failures means a pass,
    /// which includes a concept without executable children.
    pub fn update_execution_result(&mut self) {
        let mut outcome = Outcome::PASSED;
        let mut time = 0;
        for item in &self.items {
            time += item.execution_time();
            let child = item.outcome();
            if child.failed {
                outcome = child;
            }
        }
        if self.pre_hook_failure.is_some() || self.post_hook_failure.is_some() {
            outcome = Outcome {
                failed: true,
                recoverable: false,
            };
        }
        let hook_error = self
            .pre_hook_failure
            .as_ref()
            .or(self.post_hook_failure.as_ref())
            .map(|h| h.error_message.clone());
        self.execution_result = Some(ExecutionResult {
            failed: outcome.failed,
            recoverable_error: outcome.failed && outcome.recoverable,
            execution_time: time,
            error_message: hook_error,
            ..ExecutionResult::default()
        });
    }

    pub fn outcome(&self) -> Outcome {
        self.execution_result
            .as_ref()
            .map(Outcome::of)
            .unwrap_or(Outcome::PASSED)
    }

    pub fn execution_time(&self) -> u64 {
        self.execution_result.as_ref().map_or(0, |r| r.execution_time)
    }
}

/// A node of the result tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultItem {
    Step(StepResult),
    Concept(ConceptResult),
    Comment { text: String },
    Table(Table),
}

impl ResultItem {
    /// Compile the result node for a step, recursing into concepts
    pub fn from_step(step: &Step) -> Self {
        if step.is_concept {
            Self::Concept(ConceptResult::new(
                step.actual_text.clone(),
                step.concept_steps.iter().map(Self::from_step).collect(),
            ))
        } else {
            Self::Step(StepResult::new(step.actual_text.clone()))
        }
    }

    pub fn from_item(item: &Item) -> Self {
        match item {
            Item::Step(step) => Self::from_step(step),
            Item::Comment(text) => Self::Comment { text: text.clone() },
            Item::Table(table) => Self::Table(table.clone()),
        }
    }

    /// Steps and concepts consume a step when walked; nothing else does
    pub fn is_executable(&self) -> bool {
        matches!(self, Self::Step(_) | Self::Concept(_))
    }

    pub fn outcome(&self) -> Outcome {
        match self {
            Self::Step(step) => step.outcome(),
            Self::Concept(concept) => concept.outcome(),
            _ => Outcome::PASSED,
        }
    }

    pub fn execution_time(&self) -> u64 {
        match self {
            Self::Step(step) => step.execution_time(),
            Self::Concept(concept) => concept.execution_time(),
            _ => 0,
        }
    }
}

/// Result of one scenario
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub heading: String,
    pub line_no: usize,
    pub skipped: bool,
    #[serde(default)]
    pub skip_errors: Vec<String>,
    pub contexts: Vec<ResultItem>,
    pub items: Vec<ResultItem>,
    pub teardowns: Vec<ResultItem>,
    pub failed: bool,
    #[serde(default)]
    pub pre_hook_failures: Vec<HookFailure>,
    #[serde(default)]
    pub post_hook_failures: Vec<HookFailure>,
    /// Milliseconds
    pub execution_time: u64,
}

impl ScenarioResult {
    /// Compile the result tree for a scenario and the shared contexts and
    /// teardowns
    pub fn new(scenario: &Scenario, contexts: &[Step], teardowns: &[Step]) -> Self {
        Self {
            heading: scenario.heading.text.clone(),
            line_no: scenario.heading.line_no,
            contexts: contexts.iter().map(ResultItem::from_step).collect(),
            items: scenario.items.iter().map(ResultItem::from_item).collect(),
            teardowns: teardowns.iter().map(ResultItem::from_step).collect(),
            ..Self::default()
        }
    }

    pub fn set_failure(&mut self) {
        self.failed = true;
    }

    pub fn add_pre_hook(&mut self, failure: HookFailure) {
        self.pre_hook_failures.push(failure);
    }

    pub fn add_post_hook(&mut self, failure: HookFailure) {
        self.post_hook_failures.push(failure);
    }

    /// Contexts, body and teardowns in execution order
    pub fn all_items(&self) -> impl Iterator<Item = &ResultItem> {
        self.contexts
            .iter()
            .chain(self.items.iter())
            .chain(self.teardowns.iter())
    }

    pub fn all_items_mut(&mut self) -> impl Iterator<Item = &mut ResultItem> {
        self.contexts
            .iter_mut()
            .chain(self.items.iter_mut())
            .chain(self.teardowns.iter_mut())
    }

    /// Total time of every executed item
    pub fn update_execution_time(&mut self) {
        self.execution_time = self.all_items().map(ResultItem::execution_time).sum();
    }
}

/// Result of a whole spec
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecResult {
    pub name: String,
    pub file_name: String,
    pub scenarios: Vec<ScenarioResult>,
    pub failed: bool,
    #[serde(default)]
    pub pre_hook_failures: Vec<HookFailure>,
    #[serde(default)]
    pub post_hook_failures: Vec<HookFailure>,
    pub execution_time: u64,
}

impl SpecResult {
    pub fn failed_count(&self) -> usize {
        self.scenarios.iter().filter(|s| s.failed).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.scenarios.iter().filter(|s| s.skipped).count()
    }

    pub fn passed_count(&self) -> usize {
        self.scenarios
            .iter()
            .filter(|s| !s.failed && !s.skipped)
            .count()
    }
}
