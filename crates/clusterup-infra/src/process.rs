//! Subprocess adapter for the [`ProcessRunner`] port.
//!
//! Commands run to completion under tokio. stdout and stderr are read
//! concurrently and merged line by line in arrival order, which is what the
//! output extractors scan.

use std::process::{ExitStatus, Stdio};

use clusterup_core::process::{CommandSpec, ProcessOutput, ProcessRunner, RunnerError};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Exit code reported when the child was killed by a signal.
const SIGNALLED_EXIT_CODE: i32 = -1;

/// Runs commands as real child processes.
#[derive(Debug, Clone, Default)]
pub struct TokioProcessRunner {
    /// Echo every output line at `debug` level as it arrives.
    echo: bool,
}

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }
}

impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<ProcessOutput, RunnerError> {
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &spec.working_dir {
            command.current_dir(dir);
        }

        tracing::info!(
            program = %spec.program,
            args = ?spec.args,
            env_keys = ?spec.env.keys().collect::<Vec<_>>(),
            "spawning command"
        );

        let mut child = command.spawn().map_err(|source| RunnerError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

        let (line_tx, mut line_rx) = mpsc::unbounded_channel();
        let mut forwarders = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            forwarders.push(spawn_forwarder(stdout, line_tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            forwarders.push(spawn_forwarder(stderr, line_tx.clone()));
        }
        drop(line_tx);

        let mut output = String::new();
        while let Some(line) = line_rx.recv().await {
            if self.echo {
                tracing::debug!(program = %spec.program, "{line}");
            }
            output.push_str(&line);
            output.push('\n');
        }

        let output_error = |source: std::io::Error| RunnerError::Output {
            program: spec.program.clone(),
            source,
        };

        for forwarder in forwarders {
            forwarder
                .await
                .map_err(|err| output_error(std::io::Error::other(err)))?
                .map_err(output_error)?;
        }

        let status = child.wait().await.map_err(output_error)?;
        let exit_code = exit_code(status);

        tracing::info!(program = %spec.program, exit_code, "command finished");

        Ok(ProcessOutput { exit_code, output })
    }
}

fn spawn_forwarder(
    stream: impl AsyncRead + Unpin + Send + 'static,
    tx: mpsc::UnboundedSender<String>,
) -> JoinHandle<std::io::Result<()>> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Some(line) = lines.next_line().await? {
            if tx.send(line).is_err() {
                break;
            }
        }
        Ok(())
    })
}

fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(SIGNALLED_EXIT_CODE)
}
