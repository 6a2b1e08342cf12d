use crate::signals::{ForwardedSignal, SignalReceiver};
use crate::trace::TraceWriter;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;

/// Error type for non-zero process exit codes.
#[derive(Debug, thiserror::Error)]
#[error("Exit code {exit_code} returned from process: {command_line}")]
pub struct ProcessExitCodeError {
    pub exit_code: i32,
    pub command_line: String,
}

/// A fully assembled command: executable, argument vector and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessCommand {
    pub file_name: String,
    pub arguments: Vec<String>,
    pub working_directory: Option<PathBuf>,
    /// Hand the parent's stdin to the child instead of closing it.
    pub interactive: bool,
}

impl ProcessCommand {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            arguments: Vec::new(),
            working_directory: None,
            interactive: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.arguments.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// The command as a shell-quoted line. Not masked; use
    /// `masked_command_line` for anything carrying a secret.
    pub fn command_line(&self) -> String {
        self.masked_command_line(str::to_string)
    }

    /// The command as a shell-quoted line with `mask` applied to every word
    /// before quoting, so quoting cannot split a secret.
    pub fn masked_command_line(&self, mask: impl Fn(&str) -> String) -> String {
        let words: Vec<String> = std::iter::once(self.file_name.as_str())
            .chain(self.arguments.iter().map(String::as_str))
            .map(mask)
            .collect();
        shell_words::join(words)
    }
}

/// Spawns engine processes and streams their output through a trace writer.
pub struct ProcessInvoker {
    trace: Arc<dyn TraceWriter>,
}

impl ProcessInvoker {
    pub fn new(trace: Arc<dyn TraceWriter>) -> Self {
        Self { trace }
    }

    /// Spawn `command` without waiting for it.
    ///
    /// stdout and stderr are read line by line on background tasks and written
    /// to the trace writer.
    pub fn spawn(&self, command: &ProcessCommand) -> Result<ChildProcess> {
        let mut cmd = Command::new(&command.file_name);
        cmd.args(&command.arguments);
        if let Some(dir) = &command.working_directory {
            cmd.current_dir(dir);
        }
        cmd.stdin(if command.interactive { Stdio::inherit() } else { Stdio::null() });
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to start process '{}'", command.file_name))?;

        let pid = child.id();
        self.trace.verbose(&format!(
            "Process '{}' started with process id {}.",
            command.file_name,
            pid.map(|p| p.to_string()).unwrap_or_else(|| "?".to_string())
        ));

        // Engines write progress to stderr, so both streams go out at info.
        let stdout_task = child.stdout.take().map(|s| forward_lines(s, self.trace.clone()));
        let stderr_task = child.stderr.take().map(|s| forward_lines(s, self.trace.clone()));

        Ok(ChildProcess {
            child,
            pid,
            readers: stdout_task.into_iter().chain(stderr_task).collect(),
        })
    }

    /// Run `command` to completion, forwarding every signal that arrives on
    /// `signals` to the child while it runs.
    ///
    /// Returns the exit code, or `ProcessExitCodeError` when
    /// `require_exit_code_zero` is set and the code is non-zero.
    pub async fn execute(
        &self,
        command: &ProcessCommand,
        require_exit_code_zero: bool,
        signals: &mut SignalReceiver,
    ) -> Result<i32> {
        let mut child = self.spawn(command)?;
        let start = std::time::Instant::now();

        let exit_code = loop {
            tokio::select! {
                status = child.wait() => break status?,
                Some(signal) = signals.recv() => {
                    self.trace.info(&format!("Forwarding {signal} to '{}'.", command.file_name));
                    if let Err(e) = child.send_signal(signal) {
                        self.trace.warning(&format!("Failed to forward {signal}: {e:#}"));
                    }
                }
            }
        };

        self.trace.verbose(&format!(
            "Process '{}' finished with exit code {exit_code} after {:.2?}.",
            command.file_name,
            start.elapsed()
        ));

        if exit_code != 0 && require_exit_code_zero {
            return Err(ProcessExitCodeError {
                exit_code,
                command_line: command.command_line(),
            }
            .into());
        }

        Ok(exit_code)
    }
}

/// A running child process.
pub struct ChildProcess {
    child: tokio::process::Child,
    pid: Option<u32>,
    readers: Vec<JoinHandle<()>>,
}

impl ChildProcess {
    /// Non-blocking liveness check. `Ok(None)` while still running.
    pub fn try_wait(&mut self) -> Result<Option<i32>> {
        let status = self.child.try_wait().context("Failed to poll process")?;
        Ok(status.map(exit_code_of))
    }

    /// Wait for exit and drain the output readers.
    pub async fn wait(&mut self) -> Result<i32> {
        let status = self.child.wait().await.context("Failed to wait for process")?;
        for reader in self.readers.drain(..) {
            let _ = reader.await;
        }
        Ok(exit_code_of(status))
    }

    /// Forward `signal` to the child.
    #[cfg(unix)]
    pub fn send_signal(&mut self, signal: ForwardedSignal) -> Result<()> {
        match self.pid {
            Some(pid) => crate::signals::send_to_process(pid, signal),
            None => Ok(()),
        }
    }

    #[cfg(not(unix))]
    pub fn send_signal(&mut self, _signal: ForwardedSignal) -> Result<()> {
        self.child.start_kill().context("Failed to stop process")
    }
}

fn forward_lines<R>(stream: R, trace: Arc<dyn TraceWriter>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            trace.info(&line);
        }
    })
}

/// Exit code of a finished process; killed-by-signal maps to `128 + signo`
/// the way shells report it.
fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}
