use anyhow::{Context, Result};
use runner_image_common::constants::{DOCKERFILE_NAME, IMAGE_DIRECTORY};
use runner_image_common::{Distribution, ImageSpec};
use runner_image_sdk::{SignalReceiver, TraceWriter};
use std::path::PathBuf;
use std::sync::Arc;

use crate::container::{commands, ContainerEngine};

/// Builds runner images from `<root>/image/<distro>/Dockerfile`.
pub struct Builder {
    engine: Arc<dyn ContainerEngine>,
    root: PathBuf,
    trace: Arc<dyn TraceWriter>,
}

impl Builder {
    /// `root` is the repository root; it doubles as the build context.
    pub fn new(engine: Arc<dyn ContainerEngine>, root: PathBuf, trace: Arc<dyn TraceWriter>) -> Self {
        Self { engine, root, trace }
    }

    pub fn dockerfile_path(&self, distribution: Distribution) -> PathBuf {
        self.root
            .join(IMAGE_DIRECTORY)
            .join(distribution.as_str())
            .join(DOCKERFILE_NAME)
    }

    /// Build `image`. `Ok(true)` only when the engine exits with status 0.
    ///
    /// A failed build is final; there is no retry.
    pub async fn build(&self, image: &ImageSpec, signals: &mut SignalReceiver) -> Result<bool> {
        self.trace.info(&format!(
            "start distro:{} distro_version:{}{}",
            image.distribution,
            image.version,
            image
                .architecture
                .map(|a| format!(" arch:{a}"))
                .unwrap_or_default()
        ));

        let dockerfile = self.dockerfile_path(image.distribution);
        if !dockerfile.is_file() {
            anyhow::bail!("Dockerfile not found: {}", dockerfile.display());
        }

        let command = commands::build_command(self.engine.program(), image, &dockerfile, &self.root);
        self.trace.info(&command.command_line());

        let exit_code = self
            .engine
            .build(&command, signals)
            .await
            .with_context(|| format!("Failed to run '{}'", self.engine.program()))?;

        if exit_code == 0 {
            self.trace.info(&format!("build succeeded: {}", image.tag()));
            Ok(true)
        } else {
            self.trace.error(&format!("build failed with exit code {exit_code}"));
            Ok(false)
        }
    }
}
