//! Step executor

use crate::event::{EventKind, EventResult};
use crate::model::{HookFailure, Outcome, Step, StepExecutionResult, StepResult};
use crate::runner::{ExecutionResult, Message};

use super::ScenarioExecutor;

/// The `ExecuteStep` message for `step`
pub(super) fn step_message(step: &Step, scenario_failing: bool) -> Message {
    Message::ExecuteStep {
        actual_step_text: step.actual_text.clone(),
        parsed_step_text: step.parameterized_text.clone(),
        scenario_failing,
        parameters: step.args.clone(),
    }
}

impl ScenarioExecutor<'_> {
    /// Run one step between its step hooks and attach the result
    ///
    /// A failing step hook makes the step fail without recovery. The step's
    /// time covers both hooks and the step itself.
    pub(super) async fn execute_step(&mut self, step: &Step, result: &mut StepResult) -> Outcome {
        self.info.enter_step(step);
        self.publish(EventKind::StepStart, Some(step.actual_text.clone()), None);

        let mut execution = StepExecutionResult::default();
        let before = self
            .call_runner(Message::StepExecutionStarting {
                info: self.info.clone(),
            })
            .await;

        let mut step_result = if before.failed {
            execution.pre_hook_failure = Some(HookFailure::from(&before));
            ExecutionResult {
                execution_time: 0,
                ..ExecutionResult::failure(before.error_text())
            }
        } else {
            let message = step_message(step, self.info.scenario_failing());
            self.call_runner(message).await
        };
        if step_result.failed {
            tracing::debug!(step = %step.actual_text, "Step failed: {}", step_result.error_text());
            self.info.set_step_failure(
                step_result.error_message.as_deref(),
                step_result.stack_trace.as_deref(),
            );
        }

        let after = self
            .call_runner(Message::StepExecutionEnding {
                info: self.info.clone(),
            })
            .await;
        if after.failed {
            execution.post_hook_failure = Some(HookFailure::from(&after));
            if !step_result.failed {
                step_result.error_message = after.error_message.clone();
                step_result.stack_trace = after.stack_trace.clone();
            }
            step_result.failed = true;
            step_result.recoverable_error = false;
            self.info.set_step_failure(
                step_result.error_message.as_deref(),
                step_result.stack_trace.as_deref(),
            );
        }

        step_result.execution_time += before.execution_time + after.execution_time;
        execution.execution_result = step_result;
        result.execution = Some(execution);

        self.publish(
            EventKind::StepEnd,
            Some(step.actual_text.clone()),
            Some(EventResult::Step(result.clone())),
        );
        result.outcome()
    }

    /// Let the manual console stand in for the runner on `step`
    ///
    /// No step hooks fire. The result is attached like any other step result,
    /// with no execution time.
    pub(super) async fn execute_manually(&mut self, step: &Step, result: &mut StepResult) -> Outcome {
        self.info.enter_step(step);
        self.publish(EventKind::StepStart, Some(step.actual_text.clone()), None);

        let message = step_message(step, self.info.scenario_failing());
        let mut manual_result = match self.manual.as_mut() {
            Some(console) => match console.execute(message).await {
                Ok(r) => r,
                Err(e) => {
                    tracing::error!(step = %step.actual_text, "Manual execution failed: {}", e);
                    ExecutionResult::from_error(&e)
                }
            },
            None => ExecutionResult::failure("No manual console available"),
        };
        manual_result.execution_time = 0;
        if manual_result.failed {
            self.info.set_step_failure(
                manual_result.error_message.as_deref(),
                manual_result.stack_trace.as_deref(),
            );
        }

        result.execution = Some(StepExecutionResult {
            execution_result: manual_result,
            skipped: false,
            ..StepExecutionResult::default()
        });

        self.publish(
            EventKind::StepEnd,
            Some(step.actual_text.clone()),
            Some(EventResult::Step(result.clone())),
        );
        result.outcome()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::execution::testing::{fails, RecordingNotifier, ScriptedRunner};
    use crate::model::{ExecutionInfo, Scenario, ValidationErrMaps};

    async fn run_step(runner: &mut ScriptedRunner, step: &Step) -> (StepResult, ExecutionInfo, RecordingNotifier) {
        let notifier = RecordingNotifier::default();
        let err_map = ValidationErrMaps::new();
        let mut info = ExecutionInfo::default();
        info.enter_scenario(&Scenario::new("Pay", 1, Vec::new()));
        let mut result = StepResult::new(step.actual_text.clone());
        ScenarioExecutor::new(runner, &notifier, &mut info, &err_map, 1)
            .execute_step(step, &mut result)
            .await;
        (result, info, notifier)
    }

    #[tokio::test]
    async fn test_step_message_carries_identity_and_args() {
        let mut runner = ScriptedRunner::new();
        let step = Step::new("Add \"book\" to cart", "Add {} to cart", 4).with_args(vec!["book".to_string()]);
        run_step(&mut runner, &step).await;

        let execute = runner
            .received
            .iter()
            .find(|m| matches!(m, Message::ExecuteStep { .. }))
            .unwrap();
        match execute {
            Message::ExecuteStep {
                parsed_step_text,
                parameters,
                scenario_failing,
                ..
            } => {
                assert_eq!(parsed_step_text, "Add {} to cart");
                assert_eq!(parameters, &vec!["book".to_string()]);
                assert!(!scenario_failing);
            }
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn test_failed_step_updates_info_and_events() {
        let mut runner = ScriptedRunner::new().step("Pay", fails(true));
        let (result, info, notifier) = run_step(&mut runner, &Step::new("Pay", "Pay", 2)).await;

        assert!(result.outcome().failed);
        assert!(result.outcome().recoverable);
        assert!(info.scenario_failing());
        assert!(info.current_step.as_ref().unwrap().is_failed);
        assert_eq!(notifier.kinds(), vec![EventKind::StepStart, EventKind::StepEnd]);
    }

    #[tokio::test]
    async fn test_before_step_hook_failure_skips_step() {
        let mut runner =
            ScriptedRunner::new().hook("step_execution_starting", ExecutionResult::failure("no session"));
        let (result, _, _) = run_step(&mut runner, &Step::new("Pay", "Pay", 2)).await;

        assert!(runner.executed_steps().is_empty());
        let execution = result.execution.unwrap();
        assert!(execution.execution_result.failed);
        assert!(!execution.execution_result.recoverable_error);
        assert_eq!(execution.pre_hook_failure.unwrap().error_message, "no session");
        assert_eq!(runner.message_names().last(), Some(&"step_execution_ending"));
    }

    #[tokio::test]
    async fn test_after_step_hook_failure_overrides_recoverable() {
        let mut runner = ScriptedRunner::new()
            .step("Pay", fails(true))
            .hook("step_execution_ending", ExecutionResult::failure("screenshot failed"));
        let (result, _, _) = run_step(&mut runner, &Step::new("Pay", "Pay", 2)).await;
        assert!(result.outcome().halts());
    }

    #[tokio::test]
    async fn test_step_time_includes_hooks() {
        let timed = |ms| ExecutionResult {
            execution_time: ms,
            ..ExecutionResult::default()
        };
        let mut runner = ScriptedRunner::new()
            .hook("step_execution_starting", timed(1))
            .step("Pay", timed(10))
            .hook("step_execution_ending", timed(2));
        let (result, _, _) = run_step(&mut runner, &Step::new("Pay", "Pay", 2)).await;
        assert_eq!(result.execution_time(), 13);
    }
}
