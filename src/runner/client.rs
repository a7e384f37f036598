//! Runner client over stdio pipes or a local socket

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::process::{Child, Command};

use crate::common::config::{Config, RunnerConfig, TransportMode};
use crate::common::{Error, Result};

use super::protocol::{ExecutionResult, Message, Request, Response};
use super::{transport, Runner, RunnerFactory};

/// Environment variable telling a socket-mode runner where to listen
pub const RUNNER_SOCKET_ENV: &str = "STEPDRIVER_RUNNER_SOCKET";

/// Environment variable carrying the stream id to the runner
pub const RUNNER_STREAM_ENV: &str = "STEPDRIVER_STREAM";

/// How long a socket-mode runner gets to start listening
const CONNECT_TIMEOUT_SECS: u64 = 10;

type Reader = Box<dyn AsyncRead + Send + Unpin>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// Client for a runner process
pub struct RunnerClient {
    reader: Reader,
    writer: Writer,
    /// Runner process, if we started it
    child: Option<Child>,
    next_id: u64,
}

impl RunnerClient {
    /// Start the runner described by `config` for `stream`
    pub async fn start(config: &Config, stream: usize) -> Result<Self> {
        let path = config.runner_path()?;
        match config.runner.transport {
            TransportMode::Stdio => Self::spawn(&path, &config.runner.args, stream).await,
            TransportMode::Socket => {
                let name = socket_name(&config.runner, stream);
                Self::spawn_socket(&path, &config.runner.args, &name, stream).await
            }
        }
    }

    /// Spawn a runner and talk to it over its stdin/stdout
    pub async fn spawn(runner_path: &Path, args: &[String], stream: usize) -> Result<Self> {
        let mut child = Command::new(runner_path)
            .args(args)
            .env(RUNNER_STREAM_ENV, stream.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::RunnerStartFailed(format!(
                    "Failed to start {}: {}",
                    runner_path.display(),
                    e
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::RunnerStartFailed("Failed to get runner stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::RunnerStartFailed("Failed to get runner stdout".to_string()))?;

        tracing::debug!(runner = %runner_path.display(), stream, "Runner spawned on stdio");

        let mut client = Self::from_io(BufReader::new(stdout), stdin);
        client.child = Some(child);
        Ok(client)
    }

    /// Spawn a runner that listens on a local socket, then connect to it
    pub async fn spawn_socket(
        runner_path: &Path,
        args: &[String],
        socket_name: &str,
        stream: usize,
    ) -> Result<Self> {
        let child = Command::new(runner_path)
            .args(args)
            .env(RUNNER_SOCKET_ENV, socket_name)
            .env(RUNNER_STREAM_ENV, stream.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::RunnerStartFailed(format!(
                    "Failed to start {}: {}",
                    runner_path.display(),
                    e
                ))
            })?;

        let deadline = std::time::Instant::now() + Duration::from_secs(CONNECT_TIMEOUT_SECS);
        let socket = loop {
            match transport::connect(socket_name).await {
                Ok(socket) => break socket,
                Err(e) if std::time::Instant::now() >= deadline => {
                    return Err(Error::RunnerConnectionFailed(e));
                }
                Err(_) => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        };

        tracing::debug!(runner = %runner_path.display(), socket = socket_name, stream, "Connected to runner socket");

        let (reader, writer) = tokio::io::split(socket);
        let mut client = Self::from_io(BufReader::new(reader), writer);
        client.child = Some(child);
        Ok(client)
    }

    /// Wrap an already connected reader/writer pair
    pub fn from_io<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
            child: None,
            next_id: 1,
        }
    }

    /// Send a message and wait for the runner's answer
    pub async fn send(&mut self, message: Message) -> Result<ExecutionResult> {
        let id = self.next_id;
        self.next_id += 1;

        let name = message.name();
        let request = Request { id, message };
        let json = serde_json::to_vec(&request)?;
        tracing::trace!(id, message = name, "Runner request");

        transport::send_message(&mut self.writer, &json)
            .await
            .map_err(|e| Error::RunnerCommunication(e.to_string()))?;

        let response_data = transport::recv_message(&mut self.reader)
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::UnexpectedEof {
                    Error::RunnerCrashed
                } else {
                    Error::RunnerCommunication(e.to_string())
                }
            })?;

        let response: Response = serde_json::from_slice(&response_data)
            .map_err(|e| Error::Protocol(format!("Invalid response to {}: {}", name, e)))?;

        if response.id != id {
            return Err(Error::Protocol(format!(
                "Response ID mismatch: expected {}, got {}",
                id, response.id
            )));
        }

        if response.success {
            response
                .result
                .ok_or_else(|| Error::Protocol(format!("Response to {} has no result", name)))
        } else {
            let error = response.error.unwrap_or_else(|| crate::common::error::IpcError {
                code: "UNKNOWN".to_string(),
                message: "Unknown error".to_string(),
            });
            Err(Error::runner_rejected(name, &error.message))
        }
    }
}

#[async_trait]
impl Runner for RunnerClient {
    async fn execute(&mut self, message: Message) -> Result<ExecutionResult> {
        self.send(message).await
    }

    /// Ask the runner to exit and wait for it
    async fn close(&mut self) -> Result<()> {
        if let Err(e) = self.send(Message::KillProcess).await {
            tracing::debug!("Runner did not acknowledge shutdown: {}", e);
        }
        if let Some(mut child) = self.child.take() {
            let status = child.wait().await?;
            tracing::debug!(?status, "Runner exited");
        }
        Ok(())
    }
}

/// Socket name for one stream's runner
fn socket_name(config: &RunnerConfig, stream: usize) -> String {
    let base = config
        .socket_name
        .clone()
        .unwrap_or_else(|| format!("stepdriver-{}", std::process::id()));
    let name = format!("{}-{}", base, stream);
    if cfg!(unix) && !name.contains('/') {
        std::env::temp_dir()
            .join(format!("{}.sock", name))
            .to_string_lossy()
            .into_owned()
    } else {
        name
    }
}

/// Starts one runner process per stream from the loaded configuration
pub struct ProcessRunnerFactory {
    config: Config,
}

impl ProcessRunnerFactory {
    /// Fails early when the runner executable can't be found
    pub fn new(config: Config) -> Result<Self> {
        config.runner_path()?;
        Ok(Self { config })
    }
}

#[async_trait]
impl RunnerFactory for ProcessRunnerFactory {
    async fn create(&self, stream: usize) -> Result<Box<dyn Runner>> {
        Ok(Box::new(RunnerClient::start(&self.config, stream).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, split};

    /// Answer each request on the far end of a duplex pipe with `answer`
    fn fake_runner<F>(answer: F) -> RunnerClient
    where
        F: Fn(Request) -> Response + Send + 'static,
    {
        let (near, far) = duplex(64 * 1024);
        tokio::spawn(async move {
            let (mut reader, mut writer) = split(far);
            while let Ok(data) = transport::recv_message(&mut reader).await {
                let request: Request = serde_json::from_slice(&data).unwrap();
                let response = answer(request);
                let json = serde_json::to_vec(&response).unwrap();
                transport::send_message(&mut writer, &json).await.unwrap();
            }
        });
        let (reader, writer) = split(near);
        RunnerClient::from_io(reader, writer)
    }

    #[tokio::test]
    async fn test_send_returns_runner_result() {
        let mut client = fake_runner(|request| {
            let failed = matches!(request.message, Message::ExecuteStep { .. });
            Response::success(
                request.id,
                ExecutionResult {
                    failed,
                    execution_time: 12,
                    ..ExecutionResult::default()
                },
            )
        });

        let init = client.execute(Message::ScenarioDataStoreInit).await.unwrap();
        assert!(!init.failed);

        let step = client
            .execute(Message::ExecuteStep {
                actual_step_text: "Fail".to_string(),
                parsed_step_text: "Fail".to_string(),
                scenario_failing: false,
                parameters: Vec::new(),
            })
            .await
            .unwrap();
        assert!(step.failed);
        assert_eq!(step.execution_time, 12);
    }

    #[tokio::test]
    async fn test_rejected_message_is_error() {
        let mut client = fake_runner(|request| {
            Response::error(
                request.id,
                crate::common::error::IpcError {
                    code: "REJECTED".to_string(),
                    message: "not supported".to_string(),
                },
            )
        });
        let err = client.execute(Message::ScenarioDataStoreInit).await.unwrap_err();
        assert!(matches!(err, Error::RunnerRejected { .. }));
    }

    #[tokio::test]
    async fn test_mismatched_id_is_protocol_error() {
        let mut client =
            fake_runner(|request| Response::success(request.id + 100, ExecutionResult::passed()));
        let err = client.execute(Message::ScenarioDataStoreInit).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[tokio::test]
    async fn test_closed_runner_is_crash() {
        let (near, far) = duplex(1024);
        drop(far);
        let (reader, writer) = split(near);
        let mut client = RunnerClient::from_io(reader, writer);
        let err = client.execute(Message::ScenarioDataStoreInit).await.unwrap_err();
        assert!(matches!(
            err,
            Error::RunnerCrashed | Error::RunnerCommunication(_)
        ));
    }

    #[test]
    fn test_socket_names_are_per_stream() {
        let config = RunnerConfig {
            socket_name: Some("java".to_string()),
            ..RunnerConfig::default()
        };
        assert_ne!(socket_name(&config, 1), socket_name(&config, 2));
    }
}
