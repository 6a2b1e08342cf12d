// Constants shared by the build and verify flows.

use std::time::Duration;

/// Prefix of every image built from `image/<distro>/Dockerfile`.
pub const IMAGE_NAME_PREFIX: &str = "github-actions-self-hosted-runner-";

/// Directory (relative to the repository root) holding one Dockerfile per distribution.
pub const IMAGE_DIRECTORY: &str = "image";

/// Dockerfile name inside each distribution directory.
pub const DOCKERFILE_NAME: &str = "Dockerfile";

/// Directory (relative to the repository root) holding the example images.
pub const EXAMPLES_DIRECTORY: &str = "examples";

/// Build argument the Dockerfiles read the distribution version from.
pub const DISTRO_VERSION_BUILD_ARG: &str = "DISTRO_VERSION";

pub const DEFAULT_ENGINE: &str = "docker";
pub const DEFAULT_DISTRO_VERSION: &str = "latest";
pub const DEFAULT_OWNER: &str = "74th";
pub const DEFAULT_REPO: &str = "github-actions-self-hosted-runner-container";
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Prefix for generated test runner names; a random hex suffix follows.
pub const RUNNER_NAME_PREFIX: &str = "test-";

/// Length of the random hex suffix on generated runner names.
pub const RUNNER_NAME_SUFFIX_LEN: usize = 8;

/// Registry status string of a runner that is connected and idle or busy.
pub const RUNNER_STATUS_ONLINE: &str = "online";

/// Environment variable names.
pub mod variables {
    /// Registry credential read by the tools and injected into the container.
    pub const ACCESS_TOKEN: &str = "ACCESS_TOKEN";

    // Container environment for the image under test.
    pub const OWNER: &str = "OWNER";
    pub const REPO: &str = "REPO";
    pub const RUNNER_NAME: &str = "RUNNER_NAME";

    // Container environment for the example images.
    pub const RUNNER_ACCESS_TOKEN: &str = "RUNNER_ACCESS_TOKEN";
    pub const RUNNER_OWNER: &str = "RUNNER_OWNER";
    pub const RUNNER_REPO: &str = "RUNNER_REPO";
}

/// Verifier timings.
pub mod timing {
    use super::Duration;

    /// Delay before the first registry poll.
    pub const GRACE_PERIOD: Duration = Duration::from_secs(5);

    /// Number of registry polls before giving up.
    pub const MAX_POLL_ATTEMPTS: u32 = 10;

    /// Delay between registry polls.
    pub const POLL_INTERVAL: Duration = Duration::from_secs(3);
}

/// Process exit codes.
pub mod return_code {
    pub const SUCCESS: i32 = 0;
    pub const FAILURE: i32 = 1;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_budget_is_bounded() {
        assert!(timing::MAX_POLL_ATTEMPTS > 0);
        assert!(timing::POLL_INTERVAL < timing::GRACE_PERIOD);
    }

    #[test]
    fn return_codes_differ() {
        assert_ne!(return_code::SUCCESS, return_code::FAILURE);
    }
}
