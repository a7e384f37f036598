//! Scenario and concept lifecycle hooks
//!
//! A failed hook is recorded on the result it wraps and marks the current
//! scenario failed in the execution info. The walk carries on; the caller
//! decides what a failure means for the steps that follow.

use crate::model::{ConceptResult, HookFailure, ScenarioResult};
use crate::runner::{ExecutionResult, Message};

use super::ScenarioExecutor;

impl ScenarioExecutor<'_> {
    pub(super) async fn notify_before_scenario_hook(&mut self, result: &mut ScenarioResult) {
        let message = Message::ScenarioExecutionStarting {
            info: self.info.clone(),
        };
        let hook = self.call_runner(message).await;
        if hook.failed {
            self.record_hook_failure("before scenario", &hook);
            result.set_failure();
            result.add_pre_hook(HookFailure::from(&hook));
        }
    }

    pub(super) async fn notify_after_scenario_hook(&mut self, result: &mut ScenarioResult) {
        let message = Message::ScenarioExecutionEnding {
            info: self.info.clone(),
        };
        let hook = self.call_runner(message).await;
        if hook.failed {
            self.record_hook_failure("after scenario", &hook);
            result.set_failure();
            result.add_post_hook(HookFailure::from(&hook));
        }
    }

    /// Returns false when the concept's steps must not run
    pub(super) async fn notify_before_concept_hook(&mut self, concept: &mut ConceptResult) -> bool {
        let message = Message::ConceptExecutionStarting {
            info: self.info.clone(),
        };
        let hook = self.call_runner(message).await;
        if hook.failed {
            self.record_hook_failure("before concept", &hook);
            concept.pre_hook_failure = Some(HookFailure::from(&hook));
            return false;
        }
        true
    }

    pub(super) async fn notify_after_concept_hook(&mut self, concept: &mut ConceptResult) {
        let message = Message::ConceptExecutionEnding {
            info: self.info.clone(),
        };
        let hook = self.call_runner(message).await;
        if hook.failed {
            self.record_hook_failure("after concept", &hook);
            concept.post_hook_failure = Some(HookFailure::from(&hook));
        }
    }

    fn record_hook_failure(&mut self, hook: &str, result: &ExecutionResult) {
        tracing::warn!(hook, "Hook failed: {}", result.error_text());
        self.info.set_scenario_failure();
    }
}

#[cfg(test)]
mod tests {
    use crate::execution::testing::{RecordingNotifier, ScriptedRunner};
    use crate::execution::ScenarioExecutor;
    use crate::model::{ConceptResult, ExecutionInfo, Scenario, ValidationErrMaps};
    use crate::runner::{ExecutionResult, Message};

    #[tokio::test]
    async fn test_hooks_carry_current_info() {
        let mut runner = ScriptedRunner::new();
        let notifier = RecordingNotifier::default();
        let err_map = ValidationErrMaps::new();
        let mut info = ExecutionInfo::default();
        info.enter_scenario(&Scenario::new("Pay", 2, Vec::new()));

        let mut concept = ConceptResult::new("Log in", Vec::new());
        let mut executor = ScenarioExecutor::new(&mut runner, &notifier, &mut info, &err_map, 1);
        assert!(executor.notify_before_concept_hook(&mut concept).await);
        drop(executor);

        match &runner.received[0] {
            Message::ConceptExecutionStarting { info } => {
                assert_eq!(info.current_scenario.as_ref().unwrap().name, "Pay");
            }
            other => panic!("Expected concept hook, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_concept_hook_is_recorded() {
        let mut runner = ScriptedRunner::new().hook(
            "concept_execution_ending",
            ExecutionResult::failure("teardown"),
        );
        let notifier = RecordingNotifier::default();
        let err_map = ValidationErrMaps::new();
        let mut info = ExecutionInfo::default();
        info.enter_scenario(&Scenario::new("Pay", 2, Vec::new()));

        let mut concept = ConceptResult::new("Log in", Vec::new());
        ScenarioExecutor::new(&mut runner, &notifier, &mut info, &err_map, 1)
            .notify_after_concept_hook(&mut concept)
            .await;

        assert_eq!(
            concept.post_hook_failure.map(|h| h.error_message),
            Some("teardown".to_string())
        );
        assert!(info.scenario_failing());
    }
}
