//! CLI command handling
//!
//! Loads configuration and spec documents, runs the executor and formats
//! output.

use std::sync::Arc;

use colored::Colorize;

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::document;
use crate::event::{ChannelNotifier, EventKind, EventResult, ExecutionEvent};
use crate::execution::SpecExecutor;
use crate::model::{ResultItem, ScenarioResult, Spec, SpecResult, ValidationErrMaps};
use crate::runner::ProcessRunnerFactory;

/// Dispatch a CLI command
pub async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Run {
            spec,
            runner,
            runner_args,
            streams,
            manual,
            json,
            verbose,
        } => {
            let mut config = Config::load()?;
            if let Some(runner) = runner {
                config.runner.command = runner;
            }
            if !runner_args.is_empty() {
                config.runner.args = runner_args;
            }
            if let Some(streams) = streams {
                config.execution.streams = streams;
            }
            if manual {
                config.execution.manual = true;
            }

            let (parsed, err_map) = document::load(&spec)?.compile(&spec.display().to_string());
            if !json {
                println!("\n{} {}", "Running Spec:".blue().bold(), parsed.name.bold());
            }
            let result = run(parsed, err_map, config, verbose && !json).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_summary(&result);
            }

            if result.failed {
                return Err(Error::SpecFailed(format!(
                    "{} of {} scenario(s) failed",
                    result.failed_count(),
                    result.scenarios.len()
                )));
            }
            Ok(())
        }

        Commands::Validate { spec: path } => {
            let (spec, err_map) = document::load(&path)?.compile(&path.display().to_string());

            let mut count = 0;
            for scenario in &spec.scenarios {
                let errors = err_map.scenario_errors(&scenario.key());
                if errors.is_empty() {
                    println!("  {} {}", "✓".green(), scenario.heading.text);
                    continue;
                }
                println!("  {} {}", "✗".red(), scenario.heading.text);
                for error in &errors {
                    println!("      {}", error.to_string().dimmed());
                }
                count += errors.len();
            }

            if count > 0 {
                return Err(Error::SpecFailed(format!("{} validation error(s)", count)));
            }
            println!("{} {}", "✓".green().bold(), "No validation errors".green().bold());
            Ok(())
        }
    }
}

/// Execute `spec` with runners started from `config`
async fn run(
    spec: Spec,
    err_map: ValidationErrMaps,
    config: Config,
    verbose: bool,
) -> Result<SpecResult> {
    let streams = config.execution.streams;
    let manual = config.execution.manual;
    let factory = ProcessRunnerFactory::new(config)?;

    let (notifier, mut events) = ChannelNotifier::new();
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if verbose {
                print_event(&event, streams > 1);
            }
        }
    });

    let executor = SpecExecutor::new(Arc::new(notifier), Arc::new(err_map))
        .with_streams(streams)
        .with_manual(manual);
    let result = executor.run(Arc::new(spec), &factory).await;

    // Last sender goes with the executor, which ends the printer
    drop(executor);
    if let Err(e) = printer.await {
        tracing::warn!("Event printer failed: {}", e);
    }
    result
}

fn print_event(event: &ExecutionEvent, show_stream: bool) {
    let lane = if show_stream {
        format!("[{}] ", event.stream).dimmed().to_string()
    } else {
        String::new()
    };
    match (&event.kind, &event.result) {
        (EventKind::ScenarioStart, _) => {
            if let Some(heading) = &event.subject {
                println!("{}{} {}", lane, "Scenario:".bold(), heading);
            }
        }
        (EventKind::StepEnd, Some(EventResult::Step(step))) => {
            let outcome = step.outcome();
            let mark = if outcome.failed {
                "✗".red()
            } else {
                "✓".green()
            };
            println!("{}  {} {}", lane, mark, step.text.dimmed());
        }
        _ => {}
    }
}

fn print_summary(result: &SpecResult) {
    println!();
    for scenario in &result.scenarios {
        print_scenario(scenario);
    }
    for hook in result.pre_hook_failures.iter().chain(&result.post_hook_failures) {
        println!("  {} Spec hook failed: {}", "✗".red(), hook.error_message);
    }

    let counts = format!(
        "{} scenario(s): {} passed, {} failed, {} skipped ({} ms)",
        result.scenarios.len(),
        result.passed_count(),
        result.failed_count(),
        result.skipped_count(),
        result.execution_time
    );
    if result.failed {
        println!("\n{} {}\n", "✗".red().bold(), counts.red().bold());
    } else {
        println!("\n{} {}\n", "✓".green().bold(), counts.green().bold());
    }
}

fn print_scenario(scenario: &ScenarioResult) {
    if scenario.skipped {
        println!("  {} {} (skipped)", "⊘".yellow(), scenario.heading);
        for reason in &scenario.skip_errors {
            println!("      {}", reason.dimmed());
        }
        return;
    }

    if !scenario.failed {
        println!(
            "  {} {} ({} ms)",
            "✓".green(),
            scenario.heading,
            scenario.execution_time
        );
        return;
    }

    println!(
        "  {} {} ({} ms)",
        "✗".red(),
        scenario.heading,
        scenario.execution_time
    );
    for hook in scenario
        .pre_hook_failures
        .iter()
        .chain(&scenario.post_hook_failures)
    {
        println!("      Hook failed: {}", hook.error_message.red());
    }
    let mut failures = Vec::new();
    collect_failures(scenario.all_items(), &mut failures);
    for (step, message) in failures {
        println!("      {}: {}", step, message.red());
    }
}

/// Failed steps and their messages, concepts flattened
fn collect_failures<'r>(
    items: impl Iterator<Item = &'r ResultItem>,
    failures: &mut Vec<(String, String)>,
) {
    for item in items {
        match item {
            ResultItem::Step(step) => {
                if let Some(execution) = &step.execution {
                    if execution.execution_result.failed {
                        failures.push((
                            step.text.clone(),
                            execution.execution_result.error_text().to_string(),
                        ));
                    }
                }
            }
            ResultItem::Concept(concept) => {
                collect_failures(concept.items.iter(), failures);
                if let Some(hook) = concept
                    .pre_hook_failure
                    .as_ref()
                    .or(concept.post_hook_failure.as_ref())
                {
                    failures.push((concept.text.clone(), hook.error_message.clone()));
                }
            }
            ResultItem::Comment { .. } | ResultItem::Table(_) => {}
        }
    }
}
