//! Spec executor
//!
//! Runs every scenario of a spec, on one stream or several. Each stream owns
//! its runner and its execution info; the validation maps and the notifier
//! are shared. Scenarios are dealt to streams round-robin and results are
//! put back in spec order.

use std::sync::Arc;

use tokio::task::JoinSet;

use crate::common::{Error, Result};
use crate::event::{EventKind, EventResult, ExecutionEvent, Notifier};
use crate::model::{
    ExecutionInfo, HookFailure, ScenarioResult, Spec, SpecResult, ValidationErrMaps,
};
use crate::runner::{ExecutionResult, Message, Runner, RunnerFactory};

use super::manual::ManualConsole;
use super::ScenarioExecutor;

/// Stream id used for spec-level events
pub const DRIVER_STREAM: usize = 0;

pub struct SpecExecutor {
    notifier: Arc<dyn Notifier>,
    err_map: Arc<ValidationErrMaps>,
    streams: usize,
    manual: bool,
}

/// What one stream produced
#[derive(Default)]
struct StreamOutcome {
    results: Vec<(usize, ScenarioResult)>,
    pre_hook_failures: Vec<HookFailure>,
    post_hook_failures: Vec<HookFailure>,
}

impl SpecExecutor {
    pub fn new(notifier: Arc<dyn Notifier>, err_map: Arc<ValidationErrMaps>) -> Self {
        Self {
            notifier,
            err_map,
            streams: 1,
            manual: false,
        }
    }

    /// Number of parallel streams, at least one
    pub fn with_streams(mut self, streams: usize) -> Self {
        self.streams = streams.max(1);
        self
    }

    /// Allow a human to stand in for unimplemented steps
    pub fn with_manual(mut self, manual: bool) -> Self {
        self.manual = manual;
        self
    }

    /// Execute `spec` with runners from `factory`
    ///
    /// Every runner is started before the spec-start event. A runner that
    /// can't be started fails the run with nothing published. After that,
    /// everything that happens ends up in the result, and spec-end is always
    /// published; a stream task that dies is reported as an error once the
    /// other streams have finished.
    pub async fn run(&self, spec: Arc<Spec>, factory: &dyn RunnerFactory) -> Result<SpecResult> {
        let streams = self.streams.min(spec.scenarios.len()).max(1);
        tracing::info!(
            spec = %spec.name,
            scenarios = spec.scenarios.len(),
            streams,
            "Executing spec"
        );
        let mut runners = start_runners(factory, streams).await?;

        let info = ExecutionInfo::new(spec.info(), DRIVER_STREAM);
        self.notifier.notify(ExecutionEvent::new(
            EventKind::SpecStart,
            Some(spec.name.clone()),
            None,
            DRIVER_STREAM,
            &info,
        ));

        let (outcomes, failure) = if runners.len() == 1 {
            let runner = runners.remove(0);
            let console = ManualConsole::for_run(self.manual, self.streams)
                .map(|c| Box::new(c) as Box<dyn Runner>);
            let indices = (0..spec.scenarios.len()).collect();
            let outcome = run_stream(
                1,
                Arc::clone(&spec),
                indices,
                runner,
                Arc::clone(&self.notifier),
                Arc::clone(&self.err_map),
                console,
            )
            .await;
            (vec![outcome], None)
        } else {
            self.run_parallel(&spec, runners).await
        };

        let result = collect(&spec, outcomes);
        tracing::info!(
            spec = %spec.name,
            passed = result.passed_count(),
            failed = result.failed_count(),
            skipped = result.skipped_count(),
            "Spec finished"
        );

        let mut info = info;
        if result.failed || failure.is_some() {
            info.set_spec_failure();
        }
        self.notifier.notify(ExecutionEvent::new(
            EventKind::SpecEnd,
            Some(spec.name.clone()),
            Some(EventResult::Spec(Box::new(result.clone()))),
            DRIVER_STREAM,
            &info,
        ));

        match failure {
            Some(e) => Err(e),
            None => Ok(result),
        }
    }

    /// One task per runner, all joined before returning
    async fn run_parallel(
        &self,
        spec: &Arc<Spec>,
        runners: Vec<Box<dyn Runner>>,
    ) -> (Vec<StreamOutcome>, Option<Error>) {
        let streams = runners.len();
        let mut tasks = JoinSet::new();
        for (lane, runner) in runners.into_iter().enumerate() {
            let indices: Vec<usize> = (0..spec.scenarios.len())
                .filter(|i| i % streams == lane)
                .collect();
            tasks.spawn(run_stream(
                lane + 1,
                Arc::clone(spec),
                indices,
                runner,
                Arc::clone(&self.notifier),
                Arc::clone(&self.err_map),
                None,
            ));
        }

        let mut outcomes = Vec::with_capacity(streams);
        let mut failure = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    tracing::error!("Stream task failed: {}", e);
                    if failure.is_none() {
                        failure = Some(Error::Internal(format!("Stream task failed: {}", e)));
                    }
                }
            }
        }
        (outcomes, failure)
    }
}

/// Start one runner per stream, closing the ones already up if any fails
async fn start_runners(factory: &dyn RunnerFactory, streams: usize) -> Result<Vec<Box<dyn Runner>>> {
    let mut runners: Vec<Box<dyn Runner>> = Vec::with_capacity(streams);
    for stream in 1..=streams {
        match factory.create(stream).await {
            Ok(runner) => runners.push(runner),
            Err(e) => {
                tracing::error!(stream, "Failed to start runner: {}", e);
                for runner in runners.iter_mut() {
                    if let Err(e) = runner.close().await {
                        tracing::warn!("Failed to close runner: {}", e);
                    }
                }
                return Err(e);
            }
        }
    }
    Ok(runners)
}

/// Run the scenarios at `indices` on one stream, inside the spec hooks
async fn run_stream(
    stream: usize,
    spec: Arc<Spec>,
    indices: Vec<usize>,
    mut runner: Box<dyn Runner>,
    notifier: Arc<dyn Notifier>,
    err_map: Arc<ValidationErrMaps>,
    mut manual: Option<Box<dyn Runner>>,
) -> StreamOutcome {
    let mut info = ExecutionInfo::new(spec.info(), stream);
    let mut outcome = StreamOutcome::default();
    tracing::debug!(stream, scenarios = indices.len(), "Stream started");

    let before = call(
        runner.as_mut(),
        Message::SpecExecutionStarting {
            info: info.clone(),
        },
    )
    .await;
    if before.failed {
        tracing::warn!(stream, "Before spec hook failed: {}", before.error_text());
        info.set_spec_failure();
        outcome.pre_hook_failures.push(HookFailure::from(&before));
    }

    for index in indices {
        let scenario = &spec.scenarios[index];
        let mut result = ScenarioResult::new(scenario, &spec.contexts, &spec.teardowns);
        if before.failed {
            result.skipped = true;
            result.skip_errors = vec![format!(
                "Before spec hook failed: {}",
                before.error_text()
            )];
            outcome.results.push((index, result));
            continue;
        }

        info.enter_scenario(scenario);
        let mut executor =
            ScenarioExecutor::new(runner.as_mut(), notifier.as_ref(), &mut info, &err_map, stream);
        if let Some(console) = manual.as_mut() {
            executor = executor.with_manual(console.as_mut());
        }
        executor
            .execute(&mut result, scenario, &spec.contexts, &spec.teardowns)
            .await;
        outcome.results.push((index, result));
    }

    let after = call(
        runner.as_mut(),
        Message::SpecExecutionEnding {
            info: info.clone(),
        },
    )
    .await;
    if after.failed {
        tracing::warn!(stream, "After spec hook failed: {}", after.error_text());
        outcome.post_hook_failures.push(HookFailure::from(&after));
    }

    if let Err(e) = runner.close().await {
        tracing::warn!(stream, "Failed to close runner: {}", e);
    }
    tracing::debug!(stream, "Stream finished");
    outcome
}

async fn call(runner: &mut dyn Runner, message: Message) -> ExecutionResult {
    let name = message.name();
    match runner.execute(message).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(message = name, "Runner call failed: {}", e);
            ExecutionResult::from_error(&e)
        }
    }
}

/// Merge stream outcomes into one result in spec order
fn collect(spec: &Spec, outcomes: Vec<StreamOutcome>) -> SpecResult {
    let mut result = SpecResult {
        name: spec.name.clone(),
        file_name: spec.file_name.clone(),
        ..SpecResult::default()
    };
    let mut scenarios = Vec::with_capacity(spec.scenarios.len());
    for outcome in outcomes {
        scenarios.extend(outcome.results);
        result.pre_hook_failures.extend(outcome.pre_hook_failures);
        result.post_hook_failures.extend(outcome.post_hook_failures);
    }
    scenarios.sort_by_key(|(index, _)| *index);
    result.scenarios = scenarios.into_iter().map(|(_, s)| s).collect();

    result.execution_time = result.scenarios.iter().map(|s| s.execution_time).sum();
    result.failed = result.scenarios.iter().any(|s| s.failed)
        || !result.pre_hook_failures.is_empty()
        || !result.post_hook_failures.is_empty();
    result
}
