// In-memory stand-ins for the container engine and the runner registry.

use anyhow::{bail, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use runner_image_sdk::{ForwardedSignal, ProcessCommand, SignalReceiver};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::container::{ContainerEngine, ContainerProcess};
use crate::registry::{RegistryError, RunnerRegistry, RunnerStatus};

const POLL: Duration = Duration::from_millis(10);

/// How a fake container behaves after `run`.
#[derive(Debug, Clone, Copy)]
pub enum ExitPlan {
    /// Runs until signalled or stopped.
    Running,
    /// Exits on its own with the given code once the duration has elapsed.
    ExitAt(Duration, i32),
    /// Runs until stopped; forwarded signals are recorded but have no effect.
    IgnoresSignals,
    /// Runs until signalled; `stop` is recorded but has no effect.
    IgnoresStop,
    /// Runs until stopped; every liveness check fails.
    TryWaitFails,
    /// `run` itself fails.
    FailToStart,
}

#[derive(Default)]
struct FakeState {
    builds: Vec<ProcessCommand>,
    runs: Vec<ProcessCommand>,
    stops: Vec<String>,
    signals: Vec<ForwardedSignal>,
    /// Exit code forced by a signal or a stop.
    exit_code: Option<i32>,
}

pub struct FakeEngine {
    program: String,
    plan: ExitPlan,
    build_exit_code: i32,
    state: Arc<Mutex<FakeState>>,
}

impl FakeEngine {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            plan: ExitPlan::ExitAt(Duration::ZERO, 0),
            build_exit_code: 0,
            state: Arc::default(),
        }
    }

    pub fn with_exit_plan(mut self, plan: ExitPlan) -> Self {
        self.plan = plan;
        self
    }

    pub fn with_build_exit_code(mut self, code: i32) -> Self {
        self.build_exit_code = code;
        self
    }

    pub fn builds(&self) -> Vec<ProcessCommand> {
        self.state.lock().builds.clone()
    }

    pub fn runs(&self) -> Vec<ProcessCommand> {
        self.state.lock().runs.clone()
    }

    pub fn stops(&self) -> Vec<String> {
        self.state.lock().stops.clone()
    }

    pub fn forwarded_signals(&self) -> Vec<ForwardedSignal> {
        self.state.lock().signals.clone()
    }
}

#[async_trait]
impl ContainerEngine for FakeEngine {
    fn program(&self) -> &str {
        &self.program
    }

    async fn build(&self, command: &ProcessCommand, _signals: &mut SignalReceiver) -> Result<i32> {
        self.state.lock().builds.push(command.clone());
        Ok(self.build_exit_code)
    }

    fn run(&self, command: &ProcessCommand) -> Result<Box<dyn ContainerProcess>> {
        if matches!(self.plan, ExitPlan::FailToStart) {
            bail!("{}: cannot start container", self.program);
        }
        {
            let mut state = self.state.lock();
            state.runs.push(command.clone());
            state.exit_code = None;
        }
        Ok(Box::new(FakeProcess {
            plan: self.plan,
            started: Instant::now(),
            state: self.state.clone(),
        }))
    }

    async fn stop(&self, container_name: &str) -> Result<i32> {
        let mut state = self.state.lock();
        state.stops.push(container_name.to_string());
        if !matches!(self.plan, ExitPlan::IgnoresStop) {
            state.exit_code.get_or_insert(128 + 15);
        }
        Ok(0)
    }
}

struct FakeProcess {
    plan: ExitPlan,
    started: Instant,
    state: Arc<Mutex<FakeState>>,
}

impl FakeProcess {
    fn exit_code(&self) -> Option<i32> {
        if let Some(code) = self.state.lock().exit_code {
            return Some(code);
        }
        match self.plan {
            ExitPlan::ExitAt(after, code) if Instant::now() >= self.started + after => Some(code),
            _ => None,
        }
    }
}

#[async_trait]
impl ContainerProcess for FakeProcess {
    fn try_wait(&mut self) -> Result<Option<i32>> {
        if matches!(self.plan, ExitPlan::TryWaitFails) {
            bail!("cannot inspect container");
        }
        Ok(self.exit_code())
    }

    async fn wait(&mut self) -> Result<i32> {
        loop {
            if let Some(code) = self.exit_code() {
                return Ok(code);
            }
            let mut next = Instant::now() + POLL;
            if let ExitPlan::ExitAt(after, _) = self.plan {
                next = next.min(self.started + after);
            }
            tokio::time::sleep_until(next).await;
        }
    }

    fn send_signal(&mut self, signal: ForwardedSignal) -> Result<()> {
        let mut state = self.state.lock();
        state.signals.push(signal);
        if !matches!(self.plan, ExitPlan::IgnoresSignals) {
            let signo = match signal {
                ForwardedSignal::Interrupt => 2,
                ForwardedSignal::Terminate => 15,
            };
            state.exit_code.get_or_insert(128 + signo);
        }
        Ok(())
    }
}

/// Registry that replays scripted responses, then repeats a fallback.
pub struct FakeRegistry {
    script: Mutex<VecDeque<Result<Vec<RunnerStatus>, RegistryError>>>,
    fallback: Option<Vec<RunnerStatus>>,
    queried: Mutex<Vec<(String, String)>>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: None,
            queried: Mutex::new(Vec::new()),
        }
    }

    /// Queue one response.
    pub fn then(self, response: Result<Vec<RunnerStatus>, RegistryError>) -> Self {
        self.script.lock().push_back(response);
        self
    }

    /// Response once the script is exhausted. Without one, an empty list.
    pub fn otherwise(mut self, runners: Vec<RunnerStatus>) -> Self {
        self.fallback = Some(runners);
        self
    }

    pub fn queries(&self) -> usize {
        self.queried.lock().len()
    }

    pub fn queried_repos(&self) -> Vec<(String, String)> {
        self.queried.lock().clone()
    }
}

#[async_trait]
impl RunnerRegistry for FakeRegistry {
    async fn list_runners(&self, owner: &str, repo: &str) -> Result<Vec<RunnerStatus>, RegistryError> {
        self.queried.lock().push((owner.to_string(), repo.to_string()));
        match self.script.lock().pop_front() {
            Some(response) => response,
            None => Ok(self.fallback.clone().unwrap_or_default()),
        }
    }
}
