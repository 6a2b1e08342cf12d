// Example image suite: builds each image under `examples/<name>` and runs it
// once as a runner.

use anyhow::Result;
use runner_image_common::constants::{variables, EXAMPLES_DIRECTORY};
use runner_image_common::{ConfigurationError, SecretMasker};
use runner_image_sdk::{SignalReceiver, TraceWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::container::{commands, wait_forwarding, ContainerEngine};

/// Example directories shipped with the repository, in run order.
pub const EXAMPLES: [&str; 2] = ["add_scripts", "as_base_image"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExampleImage {
    pub name: String,
}

impl ExampleImage {
    /// `example-<name>` with underscores turned into dashes.
    pub fn tag(&self) -> String {
        format!("example-{}", self.name.replace('_', "-"))
    }

    pub fn directory(&self, root: &Path) -> PathBuf {
        root.join(EXAMPLES_DIRECTORY).join(&self.name)
    }
}

/// Parse a comma separated list of example names.
pub fn parse_examples(list: &str) -> Result<Vec<ExampleImage>, ConfigurationError> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            if EXAMPLES.contains(&name) {
                Ok(ExampleImage { name: name.to_string() })
            } else {
                Err(ConfigurationError::UnknownExample {
                    name: name.to_string(),
                    known: EXAMPLES.join(", "),
                })
            }
        })
        .collect()
}

pub struct ExampleSuite {
    engine: Arc<dyn ContainerEngine>,
    root: PathBuf,
    owner: String,
    repo: String,
    secret_masker: SecretMasker,
    trace: Arc<dyn TraceWriter>,
}

impl ExampleSuite {
    pub fn new(
        engine: Arc<dyn ContainerEngine>,
        root: PathBuf,
        owner: impl Into<String>,
        repo: impl Into<String>,
        secret_masker: SecretMasker,
        trace: Arc<dyn TraceWriter>,
    ) -> Self {
        Self {
            engine,
            root,
            owner: owner.into(),
            repo: repo.into(),
            secret_masker,
            trace,
        }
    }

    /// Build and run every example in order, stopping at the first step that
    /// does not exit 0.
    pub async fn run(
        &self,
        examples: &[ExampleImage],
        access_token: Option<&str>,
        signals: &mut SignalReceiver,
    ) -> Result<bool> {
        let access_token = access_token
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigurationError::MissingAccessToken {
                variable: variables::ACCESS_TOKEN,
            })?;
        self.secret_masker.add_value(access_token);

        for example in examples {
            if !self.run_one(example, access_token, signals).await? {
                self.trace.error(&format!("example {} failed", example.name));
                return Ok(false);
            }
            self.trace.info(&format!("example {} passed", example.name));
        }
        Ok(true)
    }

    async fn run_one(&self, example: &ExampleImage, access_token: &str, signals: &mut SignalReceiver) -> Result<bool> {
        let directory = example.directory(&self.root);
        if !directory.is_dir() {
            anyhow::bail!("example directory not found: {}", directory.display());
        }
        let tag = example.tag();
        let program = self.engine.program();

        let build = commands::example_build_command(program, &directory, &tag);
        self.trace.info(&build.masked_command_line(|word| self.secret_masker.mask_secrets(word)));
        let exit_code = self.engine.build(&build, signals).await?;
        if exit_code != 0 {
            self.trace.error(&format!("build exited with code {exit_code}"));
            return Ok(false);
        }

        let run = commands::example_run_command(program, &directory, &tag, &self.owner, &self.repo, access_token);
        self.trace.info(&run.masked_command_line(|word| self.secret_masker.mask_secrets(word)));
        let mut process = self.engine.run(&run)?;
        let (exit_code, interrupted) = wait_forwarding(process.as_mut(), signals, self.trace.as_ref()).await?;
        if exit_code != 0 || interrupted {
            self.trace.error(&format!("run exited with code {exit_code}"));
            return Ok(false);
        }
        Ok(true)
    }
}
