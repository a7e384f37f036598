//! Scenario executor
//!
//! Decides whether a scenario runs at all, prepares its data store, wraps
//! the body in the scenario hooks and walks contexts, body and teardowns as
//! one list.

use crate::event::{EventKind, EventResult, ExecutionEvent, Notifier};
use crate::model::{
    ExecutionInfo, Outcome, ScenarioResult, Scenario, Step, ValidationErrMaps, ValidationError,
    ValidationErrorKind,
};
use crate::runner::{ExecutionResult, Message, Runner};

use super::dispatch::pair_executable;

/// Executes one scenario on one stream
///
/// Created per scenario; borrows the stream's runner and execution info and
/// the run-wide validation maps.
pub struct ScenarioExecutor<'a> {
    pub(super) runner: &'a mut dyn Runner,
    pub(super) notifier: &'a dyn Notifier,
    pub(super) info: &'a mut ExecutionInfo,
    pub(super) err_map: &'a ValidationErrMaps,
    /// Stands in for the runner on unimplemented steps, when allowed
    pub(super) manual: Option<&'a mut dyn Runner>,
    pub(super) stream: usize,
}

impl<'a> ScenarioExecutor<'a> {
    pub fn new(
        runner: &'a mut dyn Runner,
        notifier: &'a dyn Notifier,
        info: &'a mut ExecutionInfo,
        err_map: &'a ValidationErrMaps,
        stream: usize,
    ) -> Self {
        Self {
            runner,
            notifier,
            info,
            err_map,
            manual: None,
            stream,
        }
    }

    /// Hand unimplemented steps to `console` instead of the runner
    pub fn with_manual(mut self, console: &'a mut dyn Runner) -> Self {
        self.manual = Some(console);
        self
    }

    /// Execute `scenario`, writing everything that happens into `result`
    ///
    /// `result` must have been compiled from the same scenario, contexts and
    /// teardowns. Exactly one scenario-start and one scenario-end event are
    /// published per call.
    #[tracing::instrument(skip_all, fields(scenario = %scenario.heading.text, stream = self.stream))]
    pub async fn execute(
        &mut self,
        result: &mut ScenarioResult,
        scenario: &Scenario,
        contexts: &[Step],
        teardowns: &[Step],
    ) {
        result.skipped = false;
        if !scenario.has_steps() {
            self.skip_for_missing_steps(scenario);
        }

        let errors = self.err_map.scenario_errors(&scenario.key());
        if errors.iter().any(|e| !e.is_unimplemented()) {
            tracing::debug!(errors = errors.len(), "Skipping scenario with validation errors");
            set_skip_info(result, &errors);
            self.publish_scenario(EventKind::ScenarioStart, scenario, result);
            self.publish_scenario(EventKind::ScenarioEnd, scenario, result);
            return;
        }

        self.publish_scenario(EventKind::ScenarioStart, scenario, result);
        self.run(result, scenario, contexts, teardowns).await;
        self.publish_scenario(EventKind::ScenarioEnd, scenario, result);
    }

    async fn run(
        &mut self,
        result: &mut ScenarioResult,
        scenario: &Scenario,
        contexts: &[Step],
        teardowns: &[Step],
    ) {
        let init = self.call_runner(Message::ScenarioDataStoreInit).await;
        if init.failed {
            self.handle_data_store_failure(result, scenario, &init);
            return;
        }

        self.notify_before_scenario_hook(result).await;
        if !result.failed {
            let steps = contexts
                .iter()
                .chain(scenario.steps())
                .chain(teardowns.iter());
            let pairs = pair_executable(steps, result.all_items_mut());
            let outcome: Outcome = self.execute_items(pairs).await;
            if outcome.failed {
                result.set_failure();
            }
        }
        self.notify_after_scenario_hook(result).await;
        result.update_execution_time();
    }

    fn skip_for_missing_steps(&mut self, scenario: &Scenario) {
        let error = self.heading_error(
            scenario,
            "No steps found in scenario".to_string(),
            ValidationErrorKind::InvalidScenario,
        );
        tracing::error!("{}", error);
        self.err_map.set_scenario_errors(scenario.key(), vec![error]);
    }

    fn handle_data_store_failure(
        &mut self,
        result: &mut ScenarioResult,
        scenario: &Scenario,
        init: &ExecutionResult,
    ) {
        let error = self.heading_error(
            scenario,
            format!(
                "Failed to initialize scenario datastore. Error: {}",
                init.error_text()
            ),
            ValidationErrorKind::DataStoreInitFailed,
        );
        tracing::error!("{}", error);
        let errors = vec![error];
        self.err_map.set_scenario_errors(scenario.key(), errors.clone());
        set_skip_info(result, &errors);
    }

    /// Validation error located at the scenario heading
    fn heading_error(
        &self,
        scenario: &Scenario,
        message: String,
        kind: ValidationErrorKind,
    ) -> ValidationError {
        let heading = Step::new(
            scenario.heading.text.clone(),
            scenario.heading.text.clone(),
            scenario.heading.line_no,
        );
        ValidationError::new(&heading, self.info.file_name(), message, kind)
    }

    fn publish_scenario(&self, kind: EventKind, scenario: &Scenario, result: &ScenarioResult) {
        self.publish(
            kind,
            Some(scenario.heading.text.clone()),
            Some(EventResult::Scenario(Box::new(result.clone()))),
        );
    }

    pub(super) fn publish(
        &self,
        kind: EventKind,
        subject: Option<String>,
        result: Option<EventResult>,
    ) {
        self.notifier
            .notify(ExecutionEvent::new(kind, subject, result, self.stream, self.info));
    }

    /// Send `message`, folding transport errors into a failed result
    pub(super) async fn call_runner(&mut self, message: Message) -> ExecutionResult {
        let name = message.name();
        match self.runner.execute(message).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(message = name, "Runner call failed: {}", e);
                ExecutionResult::from_error(&e)
            }
        }
    }
}

fn set_skip_info(result: &mut ScenarioResult, errors: &[ValidationError]) {
    result.skipped = true;
    result.skip_errors = errors.iter().map(ToString::to_string).collect();
}
