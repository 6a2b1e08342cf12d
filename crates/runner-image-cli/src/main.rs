// Entry point of `runner-image`: build one runner image, then optionally run it
// and check that it registers as an online runner.

use anyhow::Result;
use clap::Parser;
use runner_image_common::constants::variables;
use runner_image_common::{return_code, TraceManager};
use runner_image_sdk::{Package, SignalListener, Source, TraceWriter};
use std::sync::Arc;

use runner_image_cli::builder::Builder;
use runner_image_cli::command_settings::CommandSettings;
use runner_image_cli::container::CliContainerEngine;
use runner_image_cli::registry::GitHubRunnerRegistry;
use runner_image_cli::repository_root;
use runner_image_cli::verifier::Verifier;
use runner_image_cli::workflow::{Workflow, WorkflowRequest};

fn main() {
    let settings = CommandSettings::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to build Tokio runtime: {e}");
            std::process::exit(return_code::FAILURE);
        }
    };

    let exit_code = runtime.block_on(async move { run(settings).await });

    std::process::exit(exit_code);
}

async fn run(settings: CommandSettings) -> i32 {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::debug!("{} {} ({})", Package::NAME, Package::VERSION, Source::COMMIT_HASH);

    let trace_manager = TraceManager::default();
    let trace = trace_manager.get("runner-image");

    match execute(&settings, &trace_manager).await {
        Ok(true) => return_code::SUCCESS,
        Ok(false) => return_code::FAILURE,
        Err(e) => {
            trace.error_chain(&e);
            return_code::FAILURE
        }
    }
}

async fn execute(settings: &CommandSettings, trace_manager: &TraceManager) -> Result<bool> {
    let image = settings.image_spec()?;
    let root = repository_root::resolve(settings.root.as_deref())?;
    let engine_path = CliContainerEngine::locate(&settings.engine)?;

    let access_token = std::env::var(variables::ACCESS_TOKEN).ok();
    if let Some(token) = access_token.as_deref() {
        trace_manager.secret_masker().add_value(token);
    }

    let trace = Arc::new(trace_manager.get("runner-image"));
    trace.verbose(&format!("repository root: {}", root.display()));
    trace.verbose(&format!("container engine: {}", engine_path.display()));

    let engine = Arc::new(CliContainerEngine::new(
        settings.engine.clone(),
        Arc::new(trace_manager.get("engine")),
    ));
    let registry = Arc::new(GitHubRunnerRegistry::new(
        &settings.api_url,
        access_token.clone().unwrap_or_default(),
    )?);

    let builder = Builder::new(engine.clone(), root, Arc::new(trace_manager.get("build")));
    let verifier = Verifier::new(
        engine,
        registry,
        trace_manager.secret_masker().clone(),
        Arc::new(trace_manager.get("test")),
    );
    let workflow = Workflow::new(builder, verifier, trace);

    let mut signals = SignalListener::install()?;
    let request = WorkflowRequest {
        image,
        owner: settings.owner.clone(),
        repo: settings.repo.clone(),
        test_mode: settings.test_mode(),
    };
    workflow.execute(&request, access_token.as_deref(), &mut signals).await
}
