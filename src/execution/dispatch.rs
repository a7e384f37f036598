//! Walking executable items
//!
//! The step tree and the result tree are walked together: each executable
//! result node is paired with the step at the same position, and concepts
//! recurse into their own steps and result nodes.

use futures_util::future::BoxFuture;

use crate::event::{EventKind, EventResult};
use crate::model::{ConceptResult, Outcome, ResultItem, Step};

use super::ScenarioExecutor;

/// Pair steps with the executable nodes of `items`, in order
///
/// Comments and tables in `items` are passed over. Both trees come from the
/// same source, so the counts match; if they don't, the extra entries on the
/// longer side are left alone.
pub(super) fn pair_executable<'s, 'r>(
    steps: impl IntoIterator<Item = &'s Step>,
    items: impl IntoIterator<Item = &'r mut ResultItem>,
) -> Vec<(&'s Step, &'r mut ResultItem)> {
    let steps: Vec<&Step> = steps.into_iter().collect();
    let nodes: Vec<&mut ResultItem> = items.into_iter().filter(|i| i.is_executable()).collect();
    if steps.len() != nodes.len() {
        tracing::warn!(
            steps = steps.len(),
            nodes = nodes.len(),
            "Step tree and result tree differ"
        );
    }
    steps.into_iter().zip(nodes).collect()
}

impl<'a> ScenarioExecutor<'a> {
    /// Run `pairs` in order until a failure that can't be recovered from
    ///
    /// Returns the outcome of the last failing item, or a pass.
    pub(super) fn execute_items<'b>(
        &'b mut self,
        pairs: Vec<(&'b Step, &'b mut ResultItem)>,
    ) -> BoxFuture<'b, Outcome> {
        Box::pin(async move {
            let mut outcome = Outcome::PASSED;
            for (step, item) in pairs {
                let current = self.execute_item(step, item).await;
                if current.failed {
                    outcome = current;
                    if !current.recoverable {
                        break;
                    }
                }
            }
            outcome
        })
    }

    async fn execute_item(&mut self, step: &Step, item: &mut ResultItem) -> Outcome {
        let manual = self.manual.is_some() && self.err_map.is_unimplemented(step);
        match item {
            ResultItem::Step(result) if manual => self.execute_manually(step, result).await,
            ResultItem::Step(result) => self.execute_step(step, result).await,
            ResultItem::Concept(concept) => self.execute_concept(step, concept).await,
            ResultItem::Comment { .. } | ResultItem::Table(_) => Outcome::PASSED,
        }
    }

    /// Expand a concept between its hooks and aggregate its children
    async fn execute_concept(&mut self, step: &Step, concept: &mut ConceptResult) -> Outcome {
        self.publish(EventKind::ConceptStart, Some(step.actual_text.clone()), None);

        if self.notify_before_concept_hook(concept).await {
            let children = pair_executable(step.concept_steps.iter(), concept.items.iter_mut());
            self.execute_items(children).await;
        }
        self.notify_after_concept_hook(concept).await;
        concept.update_execution_result();

        self.publish(
            EventKind::ConceptEnd,
            Some(step.actual_text.clone()),
            Some(EventResult::Concept(concept.clone())),
        );
        concept.outcome()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::testing::{fails, RecordingNotifier, ScriptedRunner};
    use crate::model::{ExecutionInfo, Item, Scenario, ScenarioResult, ValidationErrMaps};
    use crate::runner::ExecutionResult;

    fn step(text: &str) -> Step {
        Step::new(text, text, 0)
    }

    fn login() -> Step {
        Step::concept("Log in", "Log in", 2, vec![step("Type user"), step("Submit")])
    }

    async fn run(scenario: &Scenario, runner: &mut ScriptedRunner) -> (ScenarioResult, RecordingNotifier) {
        let notifier = RecordingNotifier::default();
        let err_map = ValidationErrMaps::new();
        let mut info = ExecutionInfo::default();
        info.enter_scenario(scenario);
        let mut result = ScenarioResult::new(scenario, &[], &[]);
        ScenarioExecutor::new(runner, &notifier, &mut info, &err_map, 1)
            .execute(&mut result, scenario, &[], &[])
            .await;
        (result, notifier)
    }

    fn concept_of(result: &ScenarioResult, index: usize) -> &ConceptResult {
        match &result.items[index] {
            ResultItem::Concept(concept) => concept,
            other => panic!("Expected concept, got {:?}", other),
        }
    }

    #[test]
    fn test_pairing_skips_comments() {
        let steps = vec![step("a"), step("b")];
        let mut items = vec![
            ResultItem::Comment { text: "c".to_string() },
            ResultItem::from_step(&steps[0]),
            ResultItem::Table(Default::default()),
            ResultItem::from_step(&steps[1]),
        ];
        let pairs = pair_executable(steps.iter(), items.iter_mut());
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1].0.actual_text, "b");
        assert!(matches!(&*pairs[1].1, ResultItem::Step(s) if s.text == "b"));
    }

    #[tokio::test]
    async fn test_concept_expands_children_between_hooks() {
        let scenario = Scenario::new("Pay", 1, vec![Item::Step(login()), Item::Step(step("Pay"))]);
        let mut runner = ScriptedRunner::new();
        let (result, notifier) = run(&scenario, &mut runner).await;

        assert_eq!(runner.executed_steps(), vec!["Type user", "Submit", "Pay"]);
        let names = runner.message_names();
        let start = names.iter().position(|n| *n == "concept_execution_starting").unwrap();
        let end = names.iter().position(|n| *n == "concept_execution_ending").unwrap();
        let first_child = names.iter().position(|n| *n == "execute_step").unwrap();
        assert!(start < first_child && first_child < end);

        let concept = concept_of(&result, 0);
        assert!(concept.items.iter().all(|i| match i {
            ResultItem::Step(s) => s.executed(),
            _ => false,
        }));
        assert!(!concept.outcome().failed);

        assert_eq!(
            notifier.kinds(),
            vec![
                EventKind::ScenarioStart,
                EventKind::ConceptStart,
                EventKind::StepStart,
                EventKind::StepEnd,
                EventKind::StepStart,
                EventKind::StepEnd,
                EventKind::ConceptEnd,
                EventKind::StepStart,
                EventKind::StepEnd,
                EventKind::ScenarioEnd,
            ]
        );
    }

    #[tokio::test]
    async fn test_non_recoverable_child_halts_concept_and_scenario() {
        let scenario = Scenario::new("Pay", 1, vec![Item::Step(login()), Item::Step(step("Pay"))]);
        let mut runner = ScriptedRunner::new().step("Type user", fails(false));
        let (result, _) = run(&scenario, &mut runner).await;

        assert_eq!(runner.executed_steps(), vec!["Type user"]);
        let concept = concept_of(&result, 0);
        assert!(concept.outcome().halts());
        match &concept.items[1] {
            ResultItem::Step(submit) => assert!(!submit.executed()),
            other => panic!("Expected step, got {:?}", other),
        }
        assert!(result.failed);
    }

    #[tokio::test]
    async fn test_concept_runs_children_up_to_the_fatal_one() {
        let children = vec![step("One"), step("Two"), step("Three"), step("Four")];
        let concept = Step::concept("All four", "All four", 1, children);
        let scenario = Scenario::new("Count", 1, vec![Item::Step(concept)]);
        let mut runner = ScriptedRunner::new().step("Two", fails(false));
        let (result, _) = run(&scenario, &mut runner).await;

        assert_eq!(runner.executed_steps(), vec!["One", "Two"]);
        let concept = concept_of(&result, 0);
        assert!(concept.outcome().failed);
        let executed: Vec<bool> = concept
            .items
            .iter()
            .map(|i| matches!(i, ResultItem::Step(s) if s.executed()))
            .collect();
        assert_eq!(executed, vec![true, true, false, false]);
    }

    #[tokio::test]
    async fn test_unimplemented_step_goes_to_manual_console() {
        let wave = Step::new("Wave", "Wave", 3);
        let scenario = Scenario::new("Greet", 1, vec![Item::Step(wave.clone()), Item::Step(step("Bow"))]);
        let err_map = ValidationErrMaps::new();
        err_map.add_step_error(
            crate::model::ValidationError::new(
                &wave,
                "greet.spec",
                "Step implementation not found",
                crate::model::ValidationErrorKind::StepImplementationNotFound,
            ),
            "Wave",
        );

        let mut runner = ScriptedRunner::new();
        let mut console = ScriptedRunner::new().step(
            "Wave",
            ExecutionResult {
                execution_time: 500,
                messages: vec!["waved back".to_string()],
                ..ExecutionResult::default()
            },
        );
        let notifier = RecordingNotifier::default();
        let mut info = ExecutionInfo::default();
        info.enter_scenario(&scenario);
        let mut result = ScenarioResult::new(&scenario, &[], &[]);
        ScenarioExecutor::new(&mut runner, &notifier, &mut info, &err_map, 1)
            .with_manual(&mut console)
            .execute(&mut result, &scenario, &[], &[])
            .await;

        assert_eq!(console.executed_steps(), vec!["Wave"]);
        assert_eq!(runner.executed_steps(), vec!["Bow"]);
        match &result.items[0] {
            ResultItem::Step(wave) => {
                let execution = wave.execution.as_ref().unwrap();
                assert!(!execution.skipped);
                assert_eq!(execution.execution_result.execution_time, 0);
                assert_eq!(execution.execution_result.messages, vec!["waved back".to_string()]);
            }
            other => panic!("Expected step, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unimplemented_step_without_console_goes_to_runner() {
        let wave = Step::new("Wave", "Wave", 3);
        let scenario = Scenario::new("Greet", 1, vec![Item::Step(wave.clone())]);
        let err_map = ValidationErrMaps::new();
        err_map.add_step_error(
            crate::model::ValidationError::new(
                &wave,
                "greet.spec",
                "Step implementation not found",
                crate::model::ValidationErrorKind::StepImplementationNotFound,
            ),
            "Wave",
        );

        let mut runner = ScriptedRunner::new();
        let notifier = RecordingNotifier::default();
        let mut info = ExecutionInfo::default();
        info.enter_scenario(&scenario);
        let mut result = ScenarioResult::new(&scenario, &[], &[]);
        ScenarioExecutor::new(&mut runner, &notifier, &mut info, &err_map, 1)
            .execute(&mut result, &scenario, &[], &[])
            .await;

        assert_eq!(runner.executed_steps(), vec!["Wave"]);
    }

    #[tokio::test]
    async fn test_recoverable_child_lets_concept_and_siblings_continue() {
        let scenario = Scenario::new("Pay", 1, vec![Item::Step(login()), Item::Step(step("Pay"))]);
        let mut runner = ScriptedRunner::new().step("Type user", fails(true));
        let (result, _) = run(&scenario, &mut runner).await;

        assert_eq!(runner.executed_steps(), vec!["Type user", "Submit", "Pay"]);
        let outcome = concept_of(&result, 0).outcome();
        assert!(outcome.failed);
        assert!(outcome.recoverable);
        assert!(result.failed);
    }

    #[tokio::test]
    async fn test_nested_concepts_recurse() {
        let outer = Step::concept("Checkout", "Checkout", 1, vec![login(), step("Pay")]);
        let scenario = Scenario::new("Buy", 1, vec![Item::Step(outer)]);
        let mut runner = ScriptedRunner::new();
        let (result, _) = run(&scenario, &mut runner).await;

        assert_eq!(runner.executed_steps(), vec!["Type user", "Submit", "Pay"]);
        match &concept_of(&result, 0).items[0] {
            ResultItem::Concept(inner) => assert!(inner.execution_result.is_some()),
            other => panic!("Expected concept, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_before_concept_hook_failure_skips_children() {
        let scenario = Scenario::new("Pay", 1, vec![Item::Step(login()), Item::Step(step("Pay"))]);
        let mut runner = ScriptedRunner::new()
            .hook("concept_execution_starting", ExecutionResult::failure("hook broke"));
        let (result, _) = run(&scenario, &mut runner).await;

        assert!(runner.executed_steps().is_empty());
        let concept = concept_of(&result, 0);
        assert!(concept.pre_hook_failure.is_some());
        assert!(concept.outcome().halts());
        assert!(result.failed);
    }

    #[tokio::test]
    async fn test_empty_concept_passes() {
        let empty = Step::concept("Nothing", "Nothing", 1, Vec::new());
        let scenario = Scenario::new("Pay", 1, vec![Item::Step(empty), Item::Step(step("Pay"))]);
        let mut runner = ScriptedRunner::new();
        let (result, _) = run(&scenario, &mut runner).await;

        assert!(!concept_of(&result, 0).outcome().failed);
        assert!(!result.failed);
        assert_eq!(runner.executed_steps(), vec!["Pay"]);
    }
}
