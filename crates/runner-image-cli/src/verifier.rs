// Verifier: starts the built image as a runner container and, in check mode,
// polls the registry until that runner shows up online.
//
//   STARTED → RUNNING → ONLINE_CONFIRMED | STOPPED_EARLY | TIMED_OUT | INTERRUPTED
//
// Whatever the outcome, a container that is still running at the end is
// stopped by name.

use anyhow::Result;
use runner_image_common::constants::timing;
use runner_image_common::{ImageSpec, SecretMasker};
use runner_image_sdk::{ForwardedSignal, SignalReceiver, TraceWriter};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::container::engine::forward;
use crate::container::{commands, wait_forwarding, ContainerEngine, ContainerProcess};
use crate::identity::RunnerIdentity;
use crate::registry::{RegistryError, RunnerRegistry, RunnerStatus};

/// How long to wait for the container to exit after `stop`.
const STOP_WAIT: Duration = Duration::from_secs(30);

/// Verifier timings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyTiming {
    /// Delay before the first registry poll.
    pub grace_period: Duration,
    /// Registry polls before giving up.
    pub max_attempts: u32,
    /// Delay between registry polls.
    pub poll_interval: Duration,
}

impl Default for VerifyTiming {
    fn default() -> Self {
        Self {
            grace_period: timing::GRACE_PERIOD,
            max_attempts: timing::MAX_POLL_ATTEMPTS,
            poll_interval: timing::POLL_INTERVAL,
        }
    }
}

/// Terminal state of a verification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The runner appeared online in the registry.
    OnlineConfirmed,
    /// Run-only mode: the container exited on its own.
    Exited { exit_code: i32 },
    /// Check mode: the container exited before it was seen online.
    StoppedEarly { exit_code: i32 },
    /// Check mode: the poll budget ran out.
    TimedOut,
    /// The container exited after an operator signal was forwarded to it.
    Interrupted { exit_code: i32 },
}

impl VerificationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            VerificationOutcome::OnlineConfirmed | VerificationOutcome::Exited { exit_code: 0 }
        )
    }
}

impl fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationOutcome::OnlineConfirmed => write!(f, "online runner found"),
            VerificationOutcome::Exited { exit_code } => write!(f, "container exited with code {exit_code}"),
            VerificationOutcome::StoppedEarly { exit_code } => {
                write!(f, "container stopped before the runner came online (exit code {exit_code})")
            }
            VerificationOutcome::TimedOut => write!(f, "online runner not found"),
            VerificationOutcome::Interrupted { exit_code } => {
                write!(f, "interrupted (exit code {exit_code})")
            }
        }
    }
}

/// What to verify.
#[derive(Debug, Clone)]
pub struct VerifyRequest {
    pub image: ImageSpec,
    /// Poll the registry (`--test-full`) instead of only waiting for exit (`--test`).
    pub check: bool,
}

pub struct Verifier {
    engine: Arc<dyn ContainerEngine>,
    registry: Arc<dyn RunnerRegistry>,
    secret_masker: SecretMasker,
    trace: Arc<dyn TraceWriter>,
    timing: VerifyTiming,
}

impl Verifier {
    pub fn new(
        engine: Arc<dyn ContainerEngine>,
        registry: Arc<dyn RunnerRegistry>,
        secret_masker: SecretMasker,
        trace: Arc<dyn TraceWriter>,
    ) -> Self {
        Self {
            engine,
            registry,
            secret_masker,
            trace,
            timing: VerifyTiming::default(),
        }
    }

    pub fn with_timing(mut self, timing: VerifyTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Start the container for `request.image` as `identity` and drive it to a
    /// terminal state.
    ///
    /// Signals arriving on `signals` are forwarded to the container. They do not
    /// end polling by themselves; the next liveness check notices the exit.
    pub async fn verify(
        &self,
        request: &VerifyRequest,
        identity: &RunnerIdentity,
        signals: &mut SignalReceiver,
    ) -> Result<VerificationOutcome> {
        self.secret_masker.add_value(identity.access_token());
        self.trace.info("start test run");

        let command = commands::run_command(self.engine.program(), &request.image, identity);
        self.trace.info(&command.masked_command_line(|word| self.secret_masker.mask_secrets(word)));

        let mut run = ContainerRun {
            process: self.engine.run(&command)?,
            interrupted: false,
        };

        let result = if request.check {
            self.check(&mut run, identity, signals).await
        } else {
            self.wait_for_exit(&mut run, signals).await
        };

        self.cleanup(&mut run, identity, signals).await;

        if let Ok(outcome) = &result {
            self.trace.info(&format!(
                "test result: {} ({outcome})",
                if outcome.is_success() { "success" } else { "failed" }
            ));
        }
        result
    }

    async fn wait_for_exit(&self, run: &mut ContainerRun, signals: &mut SignalReceiver) -> Result<VerificationOutcome> {
        let (exit_code, interrupted) =
            wait_forwarding(run.process.as_mut(), signals, self.trace.as_ref()).await?;
        run.interrupted |= interrupted;
        self.trace.info(&format!("exit code: {exit_code}"));
        Ok(if run.interrupted {
            VerificationOutcome::Interrupted { exit_code }
        } else {
            VerificationOutcome::Exited { exit_code }
        })
    }

    async fn check(
        &self,
        run: &mut ContainerRun,
        identity: &RunnerIdentity,
        signals: &mut SignalReceiver,
    ) -> Result<VerificationOutcome> {
        self.sleep_forwarding(run, self.timing.grace_period, signals).await;

        if let Some(exit_code) = run.process.try_wait()? {
            self.trace.info(&format!("exit code: {exit_code}"));
            return Ok(run.stopped(exit_code));
        }

        for attempt in 1..=self.timing.max_attempts {
            if let Some(exit_code) = run.process.try_wait()? {
                self.trace.info(&format!("stopped container detected: {exit_code}"));
                return Ok(run.stopped(exit_code));
            }

            self.trace.info(&format!(
                "check runner... ({attempt}/{})",
                self.timing.max_attempts
            ));

            match self.query_registry(run, identity, signals).await {
                Ok(runners) => {
                    if let Some(runner) = runners.iter().find(|r| r.name == identity.runner_name) {
                        self.trace.info(&format!(
                            "runner {} found, status: {}",
                            runner.name, runner.status
                        ));
                        if runner.is_online() {
                            self.trace.info("online runner found");
                            return Ok(VerificationOutcome::OnlineConfirmed);
                        }
                    }
                }
                // Registration is eventually consistent; one failed query does
                // not end verification.
                Err(e) => self.trace.warning(&format!(
                    "registry query failed on attempt {attempt}: {e}"
                )),
            }

            if attempt < self.timing.max_attempts {
                self.sleep_forwarding(run, self.timing.poll_interval, signals).await;
            }
        }

        self.trace.info("online runner not found");
        Ok(VerificationOutcome::TimedOut)
    }

    /// One registry query, forwarding signals while the request is in flight.
    async fn query_registry(
        &self,
        run: &mut ContainerRun,
        identity: &RunnerIdentity,
        signals: &mut SignalReceiver,
    ) -> Result<Vec<RunnerStatus>, RegistryError> {
        let query = self.registry.list_runners(&identity.owner, &identity.repo);
        tokio::pin!(query);
        loop {
            tokio::select! {
                result = &mut query => return result,
                Some(signal) = signals.recv() => run.forward(signal, self.trace.as_ref()),
            }
        }
    }

    async fn sleep_forwarding(&self, run: &mut ContainerRun, duration: Duration, signals: &mut SignalReceiver) {
        let deadline = tokio::time::Instant::now() + duration;
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => return,
                Some(signal) = signals.recv() => run.forward(signal, self.trace.as_ref()),
            }
        }
    }

    /// Stop the container if it is still running. Runs on every path.
    ///
    /// Signals received while `stop` runs or while waiting for the exit are
    /// forwarded to the container.
    async fn cleanup(&self, run: &mut ContainerRun, identity: &RunnerIdentity, signals: &mut SignalReceiver) {
        match run.process.try_wait() {
            Ok(Some(_)) => return,
            Ok(None) => {}
            Err(e) => self.trace.warning(&format!("failed to check container state: {e:#}")),
        }

        self.trace.info("stop container");
        let stop = self.engine.stop(&identity.runner_name);
        tokio::pin!(stop);
        let stopped = loop {
            tokio::select! {
                result = &mut stop => break result,
                Some(signal) = signals.recv() => run.forward(signal, self.trace.as_ref()),
            }
        };
        match stopped {
            Ok(0) => {}
            Ok(code) => self.trace.warning(&format!("stop exited with code {code}")),
            Err(e) => {
                self.trace.warning(&format!("failed to stop container {}: {e:#}", identity.runner_name));
                return;
            }
        }

        let waited = tokio::time::timeout(
            STOP_WAIT,
            wait_forwarding(run.process.as_mut(), signals, self.trace.as_ref()),
        )
        .await;
        match waited {
            Ok(Ok((code, _))) => self.trace.verbose(&format!("container exited with code {code} after stop")),
            Ok(Err(e)) => self.trace.warning(&format!("failed to wait for container: {e:#}")),
            Err(_) => self.trace.warning("container still running after stop"),
        }
    }
}

/// The supervised container plus whether an operator signal reached it.
struct ContainerRun {
    process: Box<dyn ContainerProcess>,
    interrupted: bool,
}

impl ContainerRun {
    fn forward(&mut self, signal: ForwardedSignal, trace: &dyn TraceWriter) {
        self.interrupted = true;
        forward(self.process.as_mut(), signal, trace);
    }

    fn stopped(&self, exit_code: i32) -> VerificationOutcome {
        if self.interrupted {
            VerificationOutcome::Interrupted { exit_code }
        } else {
            VerificationOutcome::StoppedEarly { exit_code }
        }
    }
}
