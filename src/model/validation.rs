//! Validation errors produced before execution
//!
//! The maps are filled by the validation pass and read throughout a run.
//! The executor also files a few errors of its own (empty scenarios, data
//! store failures) while streams are running, so both maps sit behind a lock
//! and are shared as `Arc<ValidationErrMaps>`. Guards are never held across
//! an await point.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use super::step::Step;

/// Identifies a scenario in the error map
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScenarioKey {
    pub heading: String,
    pub line_no: usize,
}

/// What kind of problem validation found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorKind {
    /// No implementation matches the step
    StepImplementationNotFound,
    ParamsCountMismatch,
    DuplicateStepImplementation,
    /// Structural problem with the scenario itself
    InvalidScenario,
    DataStoreInitFailed,
}

/// A validation failure tied to a source location
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("{file_name}:{line_no} {message}")]
pub struct ValidationError {
    pub step_text: String,
    pub line_no: usize,
    pub file_name: String,
    pub message: String,
    pub kind: ValidationErrorKind,
}

impl ValidationError {
    pub fn new(
        step: &Step,
        file_name: impl Into<String>,
        message: impl Into<String>,
        kind: ValidationErrorKind,
    ) -> Self {
        Self {
            step_text: step.actual_text.clone(),
            line_no: step.line_no,
            file_name: file_name.into(),
            message: message.into(),
            kind,
        }
    }

    /// The step has no implementation; a human may stand in for it
    pub fn is_unimplemented(&self) -> bool {
        self.kind == ValidationErrorKind::StepImplementationNotFound
    }
}

/// Validation errors keyed by scenario and by step identity text
#[derive(Debug, Default)]
pub struct ValidationErrMaps {
    scenario_errs: RwLock<HashMap<ScenarioKey, Vec<ValidationError>>>,
    step_errs: RwLock<HashMap<String, ValidationError>>,
}

impl ValidationErrMaps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors filed against a scenario, in the order they were found
    pub fn scenario_errors(&self, key: &ScenarioKey) -> Vec<ValidationError> {
        self.scenario_errs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// Append an error to a scenario's list
    pub fn add_scenario_error(&self, key: ScenarioKey, error: ValidationError) {
        self.scenario_errs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_default()
            .push(error);
    }

    /// Replace a scenario's errors with `errors`
    pub fn set_scenario_errors(&self, key: ScenarioKey, errors: Vec<ValidationError>) {
        self.scenario_errs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, errors);
    }

    /// Error recorded for a step identity text
    pub fn step_error(&self, parameterized_text: &str) -> Option<ValidationError> {
        self.step_errs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(parameterized_text)
            .cloned()
    }

    pub fn add_step_error(&self, error: ValidationError, parameterized_text: impl Into<String>) {
        self.step_errs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(parameterized_text.into(), error);
    }

    /// Whether the step is known to have no implementation
    pub fn is_unimplemented(&self, step: &Step) -> bool {
        self.step_errs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&step.parameterized_text)
            .is_some_and(ValidationError::is_unimplemented)
    }
}
