//! Mock step runner binary for integration testing
//!
//! Speaks the runner protocol over stdin/stdout. Step outcomes are decided by
//! markers in the step text:
//!
//! - `[fails]`: the step fails and the scenario halts
//! - `[recoverable]`: the step fails and the scenario carries on
//! - `[crash]`: the runner exits without answering
//!
//! `MOCK_RUNNER_FAIL` lists message names (comma separated) that fail, e.g.
//! `scenario_data_store_init`. When `MOCK_RUNNER_LOG` is set, every message
//! is appended to that file as `<stream> <message> [step text]`.

use std::fs::OpenOptions;
use std::io::{Read, Write};

use stepdriver::{ExecutionResult, Message, Request, Response};

/// Same limit as the driver side
const MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

fn main() {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut reader = stdin.lock();
    let mut writer = stdout.lock();

    let failing: Vec<String> = std::env::var("MOCK_RUNNER_FAIL")
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    let stream = std::env::var("STEPDRIVER_STREAM").unwrap_or_else(|_| "0".to_string());

    while let Some(body) = read_frame(&mut reader) {
        let request: Request = match serde_json::from_slice(&body) {
            Ok(r) => r,
            Err(_) => continue,
        };

        log_message(&stream, &request.message);

        let name = request.message.name();
        let result = match &request.message {
            Message::ExecuteStep {
                actual_step_text, ..
            } => {
                if actual_step_text.contains("[crash]") {
                    std::process::exit(3);
                }
                step_result(actual_step_text)
            }
            _ if failing.iter().any(|f| f == name) => ExecutionResult::failure(format!("{} failed", name)),
            _ => ExecutionResult::passed(),
        };

        write_frame(&mut writer, &Response::success(request.id, result));

        if matches!(request.message, Message::KillProcess) {
            break;
        }
    }
}

fn step_result(text: &str) -> ExecutionResult {
    let mut result = if text.contains("[fails]") {
        ExecutionResult::failure(format!("{} failed", text))
    } else if text.contains("[recoverable]") {
        ExecutionResult {
            recoverable_error: true,
            ..ExecutionResult::failure(format!("{} failed", text))
        }
    } else {
        ExecutionResult::passed()
    };
    result.execution_time = 1;
    result
}

fn log_message(stream: &str, message: &Message) {
    let Ok(path) = std::env::var("MOCK_RUNNER_LOG") else {
        return;
    };
    let line = match message {
        Message::ExecuteStep {
            actual_step_text, ..
        } => format!("{} {} {}\n", stream, message.name(), actual_step_text),
        _ => format!("{} {}\n", stream, message.name()),
    };
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        file.write_all(line.as_bytes()).ok();
    }
}

fn read_frame<R: Read>(reader: &mut R) -> Option<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).ok()?;
    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE {
        return None;
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).ok()?;
    Some(body)
}

fn write_frame<W: Write>(writer: &mut W, response: &Response) {
    let body = serde_json::to_vec(response).unwrap();
    writer.write_all(&(body.len() as u32).to_le_bytes()).ok();
    writer.write_all(&body).ok();
    writer.flush().ok();
}
