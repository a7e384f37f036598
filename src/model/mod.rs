//! Execution data model: the step tree, the result tree that mirrors it,
//! validation errors and the per-stream execution info

pub mod info;
pub mod result;
pub mod step;
pub mod validation;

pub use info::{ExecutionInfo, ScenarioInfo, SpecInfo, StepInfo};
pub use result::{
    ConceptResult, HookFailure, Outcome, ResultItem, ScenarioResult, SpecResult,
    StepExecutionResult, StepResult,
};
pub use step::{Heading, Item, Scenario, Spec, Step, Table};
pub use validation::{ScenarioKey, ValidationErrMaps, ValidationError, ValidationErrorKind};
