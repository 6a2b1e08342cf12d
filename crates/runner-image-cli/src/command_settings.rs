// Command line of the `runner-image` binary. Every flag falls back to an
// environment variable.

use clap::Parser;
use runner_image_common::constants::{
    DEFAULT_API_URL, DEFAULT_DISTRO_VERSION, DEFAULT_ENGINE, DEFAULT_OWNER, DEFAULT_REPO,
};
use runner_image_common::{Architecture, ConfigurationError, Distribution, ImageSpec};
use std::path::PathBuf;

use crate::workflow::TestMode;

/// Build a self-hosted runner image and optionally check that it comes online.
#[derive(Parser, Debug, Clone)]
#[command(name = "runner-image", version)]
pub struct CommandSettings {
    /// Container engine executable.
    #[arg(short = 'e', long, env = "RUNNER_IMAGE_ENGINE", default_value = DEFAULT_ENGINE)]
    pub engine: String,

    /// Linux distribution name (ubuntu, debian).
    #[arg(short = 'd', long, env = "RUNNER_IMAGE_DISTRO")]
    pub distro: String,

    /// Distribution version, passed to the Dockerfile as DISTRO_VERSION.
    #[arg(short = 'v', long, env = "RUNNER_IMAGE_DISTRO_VERSION", default_value = DEFAULT_DISTRO_VERSION)]
    pub distro_version: String,

    /// Target architecture (amd64, x64, x86_64, arm64, aarch64).
    #[arg(short = 'a', long, env = "RUNNER_IMAGE_ARCH")]
    pub arch: Option<String>,

    /// Repository owner the test runner registers with.
    #[arg(short = 'o', long, env = "RUNNER_IMAGE_OWNER", default_value = DEFAULT_OWNER)]
    pub owner: String,

    /// Repository name the test runner registers with.
    #[arg(short = 'r', long, env = "RUNNER_IMAGE_REPO", default_value = DEFAULT_REPO)]
    pub repo: String,

    /// Run the container after the build and wait for it to exit.
    #[arg(long)]
    pub test: bool,

    /// Run the container and wait until the runner is online in the registry.
    #[arg(long)]
    pub test_full: bool,

    /// Repository root holding `image/`. Discovered when omitted.
    #[arg(long, env = "RUNNER_IMAGE_ROOT")]
    pub root: Option<PathBuf>,

    /// Base URL of the GitHub REST API.
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,
}

impl CommandSettings {
    /// Validate distribution and architecture into an `ImageSpec`.
    pub fn image_spec(&self) -> Result<ImageSpec, ConfigurationError> {
        let distribution: Distribution = self.distro.parse()?;
        let architecture = self
            .arch
            .as_deref()
            .map(str::parse::<Architecture>)
            .transpose()?;
        Ok(ImageSpec::new(distribution, self.distro_version.clone(), architecture))
    }

    /// `--test-full` implies `--test`.
    pub fn test_mode(&self) -> TestMode {
        if self.test_full {
            TestMode::Check
        } else if self.test {
            TestMode::RunOnly
        } else {
            TestMode::Skip
        }
    }
}
