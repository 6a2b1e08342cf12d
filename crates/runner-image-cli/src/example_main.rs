// Entry point of `runner-image-examples`: build and run the example images
// under `examples/`.

use anyhow::Result;
use clap::Parser;
use runner_image_common::constants::{variables, DEFAULT_ENGINE, DEFAULT_OWNER, DEFAULT_REPO};
use runner_image_common::{return_code, TraceManager};
use runner_image_sdk::SignalListener;
use std::path::PathBuf;
use std::sync::Arc;

use runner_image_cli::container::CliContainerEngine;
use runner_image_cli::example_suite::{parse_examples, ExampleSuite};
use runner_image_cli::repository_root;

/// Build and run the example images.
#[derive(Parser, Debug)]
#[command(name = "runner-image-examples", version)]
struct Args {
    /// Comma separated example names (add_scripts, as_base_image).
    #[arg(short = 't', long = "test", default_value = "add_scripts,as_base_image")]
    test: String,

    /// Container engine executable.
    #[arg(short = 'e', long, env = "RUNNER_IMAGE_ENGINE", default_value = DEFAULT_ENGINE)]
    engine: String,

    /// Repository owner the example runners register with.
    #[arg(short = 'o', long, env = "RUNNER_IMAGE_OWNER", default_value = DEFAULT_OWNER)]
    owner: String,

    /// Repository name the example runners register with.
    #[arg(short = 'r', long, env = "RUNNER_IMAGE_REPO", default_value = DEFAULT_REPO)]
    repo: String,

    /// Repository root holding `examples/`. Discovered when omitted.
    #[arg(long, env = "RUNNER_IMAGE_ROOT")]
    root: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to build Tokio runtime: {e}");
            std::process::exit(return_code::FAILURE);
        }
    };

    let exit_code = runtime.block_on(async move { run(args).await });

    std::process::exit(exit_code);
}

async fn run(args: Args) -> i32 {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let trace_manager = TraceManager::default();

    match execute(&args, &trace_manager).await {
        Ok(true) => return_code::SUCCESS,
        Ok(false) => return_code::FAILURE,
        Err(e) => {
            trace_manager.get("examples").error_chain(&e);
            return_code::FAILURE
        }
    }
}

async fn execute(args: &Args, trace_manager: &TraceManager) -> Result<bool> {
    let examples = parse_examples(&args.test)?;
    let root = repository_root::resolve(args.root.as_deref())?;
    CliContainerEngine::locate(&args.engine)?;

    let access_token = std::env::var(variables::ACCESS_TOKEN).ok();
    if let Some(token) = access_token.as_deref() {
        trace_manager.secret_masker().add_value(token);
    }

    let engine = Arc::new(CliContainerEngine::new(
        args.engine.clone(),
        Arc::new(trace_manager.get("engine")),
    ));
    let suite = ExampleSuite::new(
        engine,
        root,
        args.owner.clone(),
        args.repo.clone(),
        trace_manager.secret_masker().clone(),
        Arc::new(trace_manager.get("examples")),
    );

    let mut signals = SignalListener::install()?;
    suite.run(&examples, access_token.as_deref(), &mut signals).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn examples_are_selected_with_test_flag() {
        let args = Args::try_parse_from(["runner-image-examples", "--test", "as_base_image"]).unwrap();
        assert_eq!(args.test, "as_base_image");

        let args = Args::try_parse_from(["runner-image-examples", "-t", "add_scripts", "-e", "podman"]).unwrap();
        assert_eq!(args.test, "add_scripts");
        assert_eq!(args.engine, "podman");
    }

    #[test]
    fn runs_every_example_by_default() {
        let args = Args::try_parse_from(["runner-image-examples"]).unwrap();
        assert_eq!(parse_examples(&args.test).unwrap().len(), 2);
    }
}
