use anyhow::Result;
use runner_image_common::ImageSpec;
use runner_image_sdk::{SignalReceiver, TraceWriter};
use std::sync::Arc;

use crate::builder::Builder;
use crate::identity::RunnerIdentity;
use crate::verifier::{Verifier, VerifyRequest};

/// What to do with the image after a successful build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestMode {
    /// Build only.
    Skip,
    /// Run the container and wait for it to exit (`--test`).
    RunOnly,
    /// Run the container and poll the registry (`--test-full`).
    Check,
}

#[derive(Debug, Clone)]
pub struct WorkflowRequest {
    pub image: ImageSpec,
    pub owner: String,
    pub repo: String,
    pub test_mode: TestMode,
}

/// Build, then optionally verify.
pub struct Workflow {
    builder: Builder,
    verifier: Verifier,
    trace: Arc<dyn TraceWriter>,
}

impl Workflow {
    pub fn new(builder: Builder, verifier: Verifier, trace: Arc<dyn TraceWriter>) -> Self {
        Self {
            builder,
            verifier,
            trace,
        }
    }

    /// Returns whether every requested step succeeded.
    ///
    /// When a test run is requested the access token is checked before the
    /// build, so a missing credential never costs a build.
    pub async fn execute(
        &self,
        request: &WorkflowRequest,
        access_token: Option<&str>,
        signals: &mut SignalReceiver,
    ) -> Result<bool> {
        let identity = match request.test_mode {
            TestMode::Skip => None,
            TestMode::RunOnly | TestMode::Check => Some(RunnerIdentity::generate(
                &request.owner,
                &request.repo,
                access_token,
            )?),
        };

        if !self.builder.build(&request.image, signals).await? {
            return Ok(false);
        }

        let Some(identity) = identity else {
            return Ok(true);
        };

        self.trace.verbose(&format!("runner name: {}", identity.runner_name));
        let verify = VerifyRequest {
            image: request.image.clone(),
            check: request.test_mode == TestMode::Check,
        };
        let outcome = self.verifier.verify(&verify, &identity, signals).await?;
        Ok(outcome.is_success())
    }
}
