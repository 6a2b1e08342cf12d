// ContainerEngine wraps the engine CLI (`docker`, `podman`, ...) for the three
// primitives the tooling needs: build, run and stop.

use anyhow::Result;
use async_trait::async_trait;
use runner_image_common::ConfigurationError;
use runner_image_sdk::{
    signal_channel, ChildProcess, ForwardedSignal, ProcessCommand, ProcessInvoker, SignalReceiver,
    TraceWriter, WhichUtil,
};
use std::path::PathBuf;
use std::sync::Arc;

use super::commands;

/// A container started with `run` that the caller supervises.
#[async_trait]
pub trait ContainerProcess: Send {
    /// Non-blocking liveness check. `Ok(None)` while still running.
    fn try_wait(&mut self) -> Result<Option<i32>>;

    /// Wait for the process to exit and return its exit code.
    async fn wait(&mut self) -> Result<i32>;

    /// Forward an operator signal to the process.
    fn send_signal(&mut self, signal: ForwardedSignal) -> Result<()>;
}

/// The container engine primitives.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Executable name or path, the first word of every command.
    fn program(&self) -> &str;

    /// Run a build to completion, forwarding signals to it. Returns the exit code.
    async fn build(&self, command: &ProcessCommand, signals: &mut SignalReceiver) -> Result<i32>;

    /// Start a container without waiting for it.
    fn run(&self, command: &ProcessCommand) -> Result<Box<dyn ContainerProcess>>;

    /// Stop the container named `container_name`. Returns the exit code of `stop`.
    async fn stop(&self, container_name: &str) -> Result<i32>;
}

/// `ContainerEngine` backed by the engine's command line.
pub struct CliContainerEngine {
    program: String,
    invoker: ProcessInvoker,
}

impl CliContainerEngine {
    /// `trace` receives the engine's own output (build logs, container logs).
    pub fn new(program: impl Into<String>, trace: Arc<dyn TraceWriter>) -> Self {
        Self {
            program: program.into(),
            invoker: ProcessInvoker::new(trace),
        }
    }

    /// Find `program` on PATH before any engine work is attempted.
    pub fn locate(program: &str) -> Result<PathBuf, ConfigurationError> {
        let not_found = |reason: String| ConfigurationError::EngineNotFound {
            engine: program.to_string(),
            reason,
        };
        match WhichUtil::which(program, false) {
            Ok(Some(path)) => Ok(path),
            Ok(None) => Err(not_found("not on PATH".to_string())),
            Err(e) => Err(not_found(format!("{e:#}"))),
        }
    }
}

#[async_trait]
impl ContainerEngine for CliContainerEngine {
    fn program(&self) -> &str {
        &self.program
    }

    async fn build(&self, command: &ProcessCommand, signals: &mut SignalReceiver) -> Result<i32> {
        self.invoker.execute(command, false, signals).await
    }

    fn run(&self, command: &ProcessCommand) -> Result<Box<dyn ContainerProcess>> {
        let child = self.invoker.spawn(command)?;
        Ok(Box::new(child))
    }

    async fn stop(&self, container_name: &str) -> Result<i32> {
        // Nothing to forward while stopping; the sender is dropped right away.
        let (_, mut no_signals) = signal_channel();
        let command = commands::stop_command(&self.program, container_name);
        self.invoker.execute(&command, false, &mut no_signals).await
    }
}

#[async_trait]
impl ContainerProcess for ChildProcess {
    fn try_wait(&mut self) -> Result<Option<i32>> {
        ChildProcess::try_wait(self)
    }

    async fn wait(&mut self) -> Result<i32> {
        ChildProcess::wait(self).await
    }

    fn send_signal(&mut self, signal: ForwardedSignal) -> Result<()> {
        ChildProcess::send_signal(self, signal)
    }
}

/// Wait for `process` to exit, forwarding every signal that arrives meanwhile.
///
/// Returns the exit code and whether any signal was forwarded.
pub async fn wait_forwarding(
    process: &mut dyn ContainerProcess,
    signals: &mut SignalReceiver,
    trace: &dyn TraceWriter,
) -> Result<(i32, bool)> {
    let mut interrupted = false;
    loop {
        tokio::select! {
            status = process.wait() => return Ok((status?, interrupted)),
            Some(signal) = signals.recv() => {
                interrupted = true;
                forward(process, signal, trace);
            }
        }
    }
}

/// Forward one signal, logging instead of failing when delivery fails.
pub(crate) fn forward(process: &mut dyn ContainerProcess, signal: ForwardedSignal, trace: &dyn TraceWriter) {
    trace.info(&format!("forwarding {signal} to container"));
    if let Err(e) = process.send_signal(signal) {
        trace.warning(&format!("failed to forward {signal}: {e:#}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ExitPlan, FakeEngine};
    use runner_image_sdk::{NullTraceWriter, ProcessCommand};
    use std::time::Duration;

    #[test]
    fn program_name_is_kept() {
        let engine = CliContainerEngine::new("/usr/local/bin/podman", Arc::new(NullTraceWriter));
        assert_eq!(engine.program(), "/usr/local/bin/podman");
    }

    #[test]
    fn locate_finds_shell_and_rejects_missing_engine() {
        assert!(CliContainerEngine::locate("sh").is_ok());
        let err = CliContainerEngine::locate("no-such-engine-4b1d").unwrap_err();
        assert!(matches!(err, ConfigurationError::EngineNotFound { ref engine, .. } if engine == "no-such-engine-4b1d"));
    }

    #[tokio::test]
    async fn cli_engine_build_returns_exit_code() {
        let engine = CliContainerEngine::new("sh", Arc::new(NullTraceWriter));
        let (_tx, mut rx) = signal_channel();
        let command = ProcessCommand::new("sh").args(["-c", "exit 4"]);
        assert_eq!(engine.build(&command, &mut rx).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn cli_engine_run_is_supervised() {
        let engine = CliContainerEngine::new("sh", Arc::new(NullTraceWriter));
        let mut process = engine.run(&ProcessCommand::new("sh").args(["-c", "exit 2"])).unwrap();
        let (_tx, mut rx) = signal_channel();
        let (code, interrupted) = wait_forwarding(process.as_mut(), &mut rx, &NullTraceWriter)
            .await
            .unwrap();
        assert_eq!(code, 2);
        assert!(!interrupted);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_forwarding_delivers_signals() {
        let engine = FakeEngine::new("docker").with_exit_plan(ExitPlan::Running);
        let mut process = engine.run(&ProcessCommand::new("docker").arg("run")).unwrap();
        let (tx, mut rx) = signal_channel();
        tx.send(ForwardedSignal::Terminate).unwrap();

        let (code, interrupted) = wait_forwarding(process.as_mut(), &mut rx, &NullTraceWriter)
            .await
            .unwrap();
        assert_eq!(code, 128 + 15);
        assert!(interrupted);
        assert_eq!(engine.forwarded_signals(), vec![ForwardedSignal::Terminate]);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_forwarding_without_signals() {
        let engine = FakeEngine::new("docker")
            .with_exit_plan(ExitPlan::ExitAt(Duration::from_secs(2), 0));
        let mut process = engine.run(&ProcessCommand::new("docker").arg("run")).unwrap();
        let (_tx, mut rx) = signal_channel();
        let (code, interrupted) = wait_forwarding(process.as_mut(), &mut rx, &NullTraceWriter)
            .await
            .unwrap();
        assert_eq!(code, 0);
        assert!(!interrupted);
    }
}
