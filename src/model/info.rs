//! What is executing right now
//!
//! Each stream owns one `ExecutionInfo` and lends it to the executors it
//! runs. Hook messages and events carry snapshots of it.

use serde::{Deserialize, Serialize};

use super::step::{Scenario, Step};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecInfo {
    pub name: String,
    pub file_name: String,
    pub is_failed: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioInfo {
    pub name: String,
    pub is_failed: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepInfo {
    pub text: String,
    pub is_failed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
}

/// Current spec, scenario and step of one stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionInfo {
    pub current_spec: SpecInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_scenario: Option<ScenarioInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<StepInfo>,
    pub stream: usize,
}

impl ExecutionInfo {
    pub fn new(spec: SpecInfo, stream: usize) -> Self {
        Self {
            current_spec: spec,
            current_scenario: None,
            current_step: None,
            stream,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.current_spec.file_name
    }

    /// Make `scenario` current, clearing the previous scenario and step
    pub fn enter_scenario(&mut self, scenario: &Scenario) {
        self.current_scenario = Some(ScenarioInfo {
            name: scenario.heading.text.clone(),
            is_failed: false,
            tags: scenario.tags.clone(),
        });
        self.current_step = None;
    }

    pub fn enter_step(&mut self, step: &Step) {
        self.current_step = Some(StepInfo {
            text: step.actual_text.clone(),
            ..StepInfo::default()
        });
    }

    pub fn set_spec_failure(&mut self) {
        self.current_spec.is_failed = true;
    }

    /// Marks the spec failed too
    pub fn set_scenario_failure(&mut self) {
        self.set_spec_failure();
        if let Some(scenario) = self.current_scenario.as_mut() {
            scenario.is_failed = true;
        }
    }

    /// Marks the scenario and spec failed too
    pub fn set_step_failure(&mut self, error_message: Option<&str>, stack_trace: Option<&str>) {
        self.set_scenario_failure();
        if let Some(step) = self.current_step.as_mut() {
            step.is_failed = true;
            step.error_message = error_message.map(String::from);
            step.stack_trace = stack_trace.map(String::from);
        }
    }

    pub fn scenario_failing(&self) -> bool {
        self.current_scenario.as_ref().is_some_and(|s| s.is_failed)
    }
}
