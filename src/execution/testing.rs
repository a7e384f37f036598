//! Scripted runner and recording notifier for executor tests

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::common::{Error, Result};
use crate::event::{EventKind, ExecutionEvent, Notifier};
use crate::runner::{ExecutionResult, Message, Runner, RunnerFactory};

/// A failed step result
pub fn fails(recoverable: bool) -> ExecutionResult {
    ExecutionResult {
        recoverable_error: recoverable,
        ..ExecutionResult::failure("assertion failed")
    }
}

/// Answers from a script and records every message it gets
///
/// Anything not scripted passes.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRunner {
    pub received: Vec<Message>,
    steps: HashMap<String, ExecutionResult>,
    hooks: HashMap<&'static str, ExecutionResult>,
    data_store: Option<ExecutionResult>,
    crashes: HashSet<String>,
    panics: HashSet<String>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the step with `actual_text` with `result`
    pub fn step(mut self, actual_text: &str, result: ExecutionResult) -> Self {
        self.steps.insert(actual_text.to_string(), result);
        self
    }

    /// Answer the hook message named `name` with `result`
    pub fn hook(mut self, name: &'static str, result: ExecutionResult) -> Self {
        self.hooks.insert(name, result);
        self
    }

    pub fn data_store(mut self, result: ExecutionResult) -> Self {
        self.data_store = Some(result);
        self
    }

    /// Fail the transport when the step with `actual_text` is sent
    pub fn crash_on(mut self, actual_text: &str) -> Self {
        self.crashes.insert(actual_text.to_string());
        self
    }

    /// Panic when the step with `actual_text` is sent
    pub fn panic_on(mut self, actual_text: &str) -> Self {
        self.panics.insert(actual_text.to_string());
        self
    }

    pub fn message_names(&self) -> Vec<&'static str> {
        self.received.iter().map(Message::name).collect()
    }

    /// Texts of the executed steps, in order
    pub fn executed_steps(&self) -> Vec<String> {
        self.received
            .iter()
            .filter_map(|m| match m {
                Message::ExecuteStep {
                    actual_step_text, ..
                } => Some(actual_step_text.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Runner for ScriptedRunner {
    async fn execute(&mut self, message: Message) -> Result<ExecutionResult> {
        if let Message::ExecuteStep {
            actual_step_text, ..
        } = &message
        {
            if self.panics.contains(actual_step_text) {
                panic!("scripted panic on {}", actual_step_text);
            }
        }
        let (result, crash) = match &message {
            Message::ExecuteStep {
                actual_step_text, ..
            } => (
                self.steps.get(actual_step_text).cloned(),
                self.crashes.contains(actual_step_text),
            ),
            Message::ScenarioDataStoreInit => (self.data_store.clone(), false),
            other => (self.hooks.get(other.name()).cloned(), false),
        };
        self.received.push(message);
        if crash {
            return Err(Error::RunnerCrashed);
        }
        Ok(result.unwrap_or_default())
    }
}

/// Hands out clones of one scripted runner and keeps what each stream got
#[derive(Debug, Default)]
pub struct ScriptedFactory {
    script: ScriptedRunner,
    fail_on: Option<usize>,
    pub streams: Mutex<Vec<usize>>,
}

impl ScriptedFactory {
    pub fn new(script: ScriptedRunner) -> Self {
        Self {
            script,
            fail_on: None,
            streams: Mutex::new(Vec::new()),
        }
    }

    /// Refuse to start the runner for `stream`
    pub fn failing_on(mut self, stream: usize) -> Self {
        self.fail_on = Some(stream);
        self
    }
}

#[async_trait]
impl RunnerFactory for ScriptedFactory {
    async fn create(&self, stream: usize) -> Result<Box<dyn Runner>> {
        self.streams.lock().unwrap().push(stream);
        if self.fail_on == Some(stream) {
            return Err(Error::RunnerStartFailed(format!("stream {} refused", stream)));
        }
        Ok(Box::new(self.script.clone()))
    }
}

/// Keeps every event it is given
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<ExecutionEvent>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<ExecutionEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events().iter().map(|e| e.kind).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: ExecutionEvent) {
        self.events.lock().unwrap().push(event);
    }
}
