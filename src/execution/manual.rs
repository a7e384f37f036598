//! Manual execution of unimplemented steps
//!
//! When enabled, a human at the terminal reports the outcome of steps that
//! have no implementation. The console is a [`Runner`] so the executor can
//! hand it the same `ExecuteStep` message the real runner would get.

use std::io::{self, BufRead, BufReader, IsTerminal, Stdin, Stdout, Write};

use async_trait::async_trait;

use crate::common::{Error, Result};
use crate::runner::{ExecutionResult, Message, Runner};

/// Ends a block of free-form messages (Ctrl-])
pub const MESSAGE_TERMINATOR: char = '\u{1d}';

/// Whether a run may ask a human for step outcomes
///
/// Needs the option turned on, a single stream and an interactive terminal.
pub fn manual_execution_eligible(enabled: bool, streams: usize) -> bool {
    enabled && streams <= 1 && io::stdout().is_terminal()
}

/// Prompts for step outcomes on `output` and reads answers from `input`
pub struct ManualConsole<R, W> {
    input: R,
    output: W,
}

impl ManualConsole<BufReader<Stdin>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }

    /// The terminal console, if this run is eligible for one
    pub fn for_run(enabled: bool, streams: usize) -> Option<Self> {
        manual_execution_eligible(enabled, streams).then(Self::stdio)
    }
}

impl<R: BufRead, W: Write> ManualConsole<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Ask for the outcome of one step
    ///
    /// Anything other than `P` counts as a failure. A failure is recoverable
    /// unless the answer to the halt prompt is `Y`.
    pub fn execute_step(&mut self, step_text: &str) -> io::Result<ExecutionResult> {
        writeln!(self.output, "\n\nManual execution of: {}", step_text)?;
        write!(self.output, "Enter [P] for passed step, [F] for failed step (default): ")?;
        self.output.flush()?;
        let failed = !self.read_answer()?.eq_ignore_ascii_case("p");

        let mut recoverable = false;
        if failed {
            write!(self.output, "Halt scenario execution? [Y/N]: ")?;
            self.output.flush()?;
            recoverable = !self.read_answer()?.eq_ignore_ascii_case("y");
        }

        writeln!(self.output, "Enter any additional messages, <Ctrl-]> to finish:")?;
        self.output.flush()?;
        let messages = self.read_messages()?;

        Ok(ExecutionResult {
            failed,
            recoverable_error: failed && recoverable,
            execution_time: 0,
            messages,
            ..ExecutionResult::default()
        })
    }

    fn read_answer(&mut self) -> io::Result<String> {
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(line.trim().to_string())
    }

    /// Lines up to the one ending in the terminator, or end of input
    fn read_messages(&mut self) -> io::Result<Vec<String>> {
        let mut messages = Vec::new();
        loop {
            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                break;
            }
            let line = line.trim_end_matches(['\r', '\n']);
            if let Some(last) = line.strip_suffix(MESSAGE_TERMINATOR) {
                messages.push(last.to_string());
                break;
            }
            messages.push(line.to_string());
        }
        Ok(messages)
    }
}

#[async_trait]
impl<R, W> Runner for ManualConsole<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    async fn execute(&mut self, message: Message) -> Result<ExecutionResult> {
        match message {
            Message::ExecuteStep {
                actual_step_text, ..
            } => Ok(self.execute_step(&actual_step_text)?),
            other => Err(Error::runner_rejected(
                other.name(),
                "manual console only executes steps",
            )),
        }
    }
}
