//! Runner protocol message types
//!
//! Defines the request/response format for stepdriver ↔ runner
//! communication. Uses a simple length-prefixed JSON protocol.

use serde::{Deserialize, Serialize};

use crate::common::error::IpcError;
use crate::model::ExecutionInfo;

/// Request sent to the runner
#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    /// Request ID for matching responses
    pub id: u64,
    /// The message to process
    pub message: Message,
}

/// Response from the runner
#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    /// Request ID this response corresponds to
    pub id: u64,
    /// Whether the runner processed the message
    ///
    /// A failing step is still a successful response; `success` is false only
    /// when the runner could not handle the message at all.
    pub success: bool,
    /// Execution status on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ExecutionResult>,
    /// Error information on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<IpcError>,
}

impl Response {
    /// Create a success response
    pub fn success(id: u64, result: ExecutionResult) -> Self {
        Self {
            id,
            success: true,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: u64, error: IpcError) -> Self {
        Self {
            id,
            success: false,
            result: None,
            error: Some(error),
        }
    }
}

/// Messages the executor sends to the runner
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    // === Data Stores ===
    /// Reset the per-scenario data store
    ScenarioDataStoreInit,

    // === Lifecycle Hooks ===
    SpecExecutionStarting { info: ExecutionInfo },
    SpecExecutionEnding { info: ExecutionInfo },
    ScenarioExecutionStarting { info: ExecutionInfo },
    ScenarioExecutionEnding { info: ExecutionInfo },
    ConceptExecutionStarting { info: ExecutionInfo },
    ConceptExecutionEnding { info: ExecutionInfo },
    StepExecutionStarting { info: ExecutionInfo },
    StepExecutionEnding { info: ExecutionInfo },

    // === Steps ===
    /// Run the implementation matching `parsed_step_text`
    ExecuteStep {
        actual_step_text: String,
        parsed_step_text: String,
        scenario_failing: bool,
        parameters: Vec<String>,
    },

    // === Shutdown ===
    /// Ask the runner to exit
    KillProcess,
}

impl Message {
    /// Short name used in logs and error messages
    pub fn name(&self) -> &'static str {
        match self {
            Self::ScenarioDataStoreInit => "scenario_data_store_init",
            Self::SpecExecutionStarting { .. } => "spec_execution_starting",
            Self::SpecExecutionEnding { .. } => "spec_execution_ending",
            Self::ScenarioExecutionStarting { .. } => "scenario_execution_starting",
            Self::ScenarioExecutionEnding { .. } => "scenario_execution_ending",
            Self::ConceptExecutionStarting { .. } => "concept_execution_starting",
            Self::ConceptExecutionEnding { .. } => "concept_execution_ending",
            Self::StepExecutionStarting { .. } => "step_execution_starting",
            Self::StepExecutionEnding { .. } => "step_execution_ending",
            Self::ExecuteStep { .. } => "execute_step",
            Self::KillProcess => "kill_process",
        }
    }
}

/// Status of one runner call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub failed: bool,
    /// Siblings of the failing item may still run
    #[serde(default)]
    pub recoverable_error: bool,
    /// Milliseconds
    #[serde(default)]
    pub execution_time: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
    /// Base64 encoded image captured by the runner on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}

impl ExecutionResult {
    /// A passing result with no time or messages
    pub fn passed() -> Self {
        Self::default()
    }

    /// A non-recoverable failure carrying `message`
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            failed: true,
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Fold a transport error into a non-recoverable failure
    pub fn from_error(error: &crate::common::Error) -> Self {
        Self::failure(error.to_string())
    }

    /// Error message, or the empty string
    pub fn error_text(&self) -> &str {
        self.error_message.as_deref().unwrap_or("")
    }
}
