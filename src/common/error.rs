//! Error types for stepdriver
//!
//! Execution failures (failed steps, hook failures, skipped scenarios) are
//! never errors: they are recorded in the result tree. This type covers the
//! plumbing around execution: talking to the runner, reading spec documents
//! and configuration.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for stepdriver
#[derive(Error, Debug)]
pub enum Error {
    // === Runner Connection Errors ===
    #[error("Runner '{name}' not found. Searched: {searched}")]
    RunnerNotFound { name: String, searched: String },

    #[error("Runner failed to start: {0}")]
    RunnerStartFailed(String),

    #[error("Failed to connect to runner: {0}")]
    RunnerConnectionFailed(#[source] io::Error),

    #[error("Runner exited unexpectedly")]
    RunnerCrashed,

    #[error("Runner communication error: {0}")]
    RunnerCommunication(String),

    // === Protocol Errors ===
    #[error("Runner protocol error: {0}")]
    Protocol(String),

    #[error("Runner rejected '{message}': {reason}")]
    RunnerRejected { message: String, reason: String },

    // === Spec Document Errors ===
    #[error("Invalid spec document '{path}': {reason}")]
    InvalidDocument { path: String, reason: String },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // === Run Errors ===
    #[error("Spec failed: {0}")]
    SpecFailed(String),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a runner not found error with search paths
    pub fn runner_not_found<S: AsRef<str>>(name: &str, paths: &[S]) -> Self {
        Self::RunnerNotFound {
            name: name.to_string(),
            searched: paths.iter().map(|s| s.as_ref()).collect::<Vec<_>>().join(", "),
        }
    }

    /// Create a runner rejected error
    pub fn runner_rejected(message: &str, reason: &str) -> Self {
        Self::RunnerRejected {
            message: message.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an invalid document error
    pub fn invalid_document(path: &str, reason: impl Into<String>) -> Self {
        Self::InvalidDocument {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

/// IPC-serializable error for runner responses
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IpcError {
    pub code: String,
    pub message: String,
}

impl From<&Error> for IpcError {
    fn from(e: &Error) -> Self {
        let code = match e {
            Error::RunnerCrashed => "RUNNER_CRASHED",
            Error::Protocol(_) => "PROTOCOL_ERROR",
            Error::RunnerRejected { .. } => "REJECTED",
            Error::Json(_) => "INVALID_REQUEST",
            _ => "INTERNAL_ERROR",
        }
        .to_string();

        Self {
            code,
            message: e.to_string(),
        }
    }
}

impl From<IpcError> for Error {
    fn from(e: IpcError) -> Self {
        match e.code.as_str() {
            "RUNNER_CRASHED" => Error::RunnerCrashed,
            "PROTOCOL_ERROR" | "INVALID_REQUEST" => Error::Protocol(e.message),
            _ => Error::RunnerCommunication(e.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipc_error_round_trip_keeps_kind() {
        let ipc = IpcError::from(&Error::RunnerCrashed);
        assert_eq!(ipc.code, "RUNNER_CRASHED");
        assert!(matches!(Error::from(ipc), Error::RunnerCrashed));
    }

    #[test]
    fn test_unknown_ipc_code_maps_to_communication() {
        let err = Error::from(IpcError {
            code: "WHATEVER".to_string(),
            message: "boom".to_string(),
        });
        assert_eq!(err.to_string(), "Runner communication error: boom");
    }

    #[test]
    fn test_runner_not_found_lists_search_paths() {
        let err = Error::runner_not_found("js-runner", &["/usr/bin", "/opt/bin"]);
        assert_eq!(
            err.to_string(),
            "Runner 'js-runner' not found. Searched: /usr/bin, /opt/bin"
        );
    }
}
