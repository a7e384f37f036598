//! Configuration file handling

use serde::Deserialize;
use std::path::PathBuf;

use super::paths::config_path;
use super::Result;

/// Environment variable that switches manual execution on (`"true"`, any case)
pub const MANUAL_EXECUTION_ENV: &str = "STEPDRIVER_MANUAL_EXECUTION";

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// How to reach the step-implementation runner
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Execution settings
    #[serde(default)]
    pub execution: ExecutionConfig,
}

/// Transport used to exchange messages with the runner
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    /// Spawn the runner and talk over its stdin/stdout
    #[default]
    Stdio,
    /// Spawn the runner and connect to the local socket it listens on
    Socket,
}

/// Configuration for the runner process
#[derive(Debug, Deserialize, Clone)]
pub struct RunnerConfig {
    /// Runner executable, absolute or looked up on PATH
    #[serde(default = "default_runner_command")]
    pub command: String,

    /// Additional arguments to pass to the runner
    #[serde(default)]
    pub args: Vec<String>,

    /// Transport mode
    #[serde(default)]
    pub transport: TransportMode,

    /// Local socket name the runner listens on (socket transport only)
    #[serde(default)]
    pub socket_name: Option<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            command: default_runner_command(),
            args: Vec::new(),
            transport: TransportMode::default(),
            socket_name: None,
        }
    }
}

fn default_runner_command() -> String {
    "stepdriver-runner".to_string()
}

/// Execution settings
#[derive(Debug, Deserialize)]
pub struct ExecutionConfig {
    /// Allow interactive execution of unimplemented steps
    #[serde(default)]
    pub manual: bool,

    /// Number of parallel streams
    #[serde(default = "default_streams")]
    pub streams: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            manual: false,
            streams: default_streams(),
        }
    }
}

fn default_streams() -> usize {
    1
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist. The manual
    /// execution environment variable, when set, overrides the file.
    pub fn load() -> Result<Self> {
        let mut config = Self::default();
        if let Some(path) = config_path() {
            if path.exists() {
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    super::Error::FileRead {
                        path: path.display().to_string(),
                        error: e.to_string(),
                    }
                })?;
                config = Self::parse(&content)?;
            }
        }
        if let Ok(value) = std::env::var(MANUAL_EXECUTION_ENV) {
            config.execution.manual = manual_flag(&value);
        }
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }

    /// Resolve the runner executable
    ///
    /// Absolute or relative paths are used as they are; bare names are
    /// searched on PATH.
    pub fn runner_path(&self) -> Result<PathBuf> {
        let command = PathBuf::from(&self.runner.command);
        if command.components().count() > 1 {
            return Ok(command);
        }
        which::which(&self.runner.command).map_err(|_| {
            let path = std::env::var_os("PATH").unwrap_or_default();
            let searched: Vec<String> = std::env::split_paths(&path)
                .map(|p| p.display().to_string())
                .collect();
            super::Error::runner_not_found(&self.runner.command, &searched)
        })
    }
}

/// Interpret a manual execution setting value
pub fn manual_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}
