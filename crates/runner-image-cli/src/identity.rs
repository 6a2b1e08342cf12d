use runner_image_common::constants::{variables, RUNNER_NAME_PREFIX, RUNNER_NAME_SUFFIX_LEN};
use runner_image_common::ConfigurationError;
use std::fmt;
use uuid::Uuid;

/// Who the container under test registers as.
///
/// `runner_name` is the only link between the local container and its
/// registry entry, so it is generated fresh for every verification run.
#[derive(Clone)]
pub struct RunnerIdentity {
    pub runner_name: String,
    pub owner: String,
    pub repo: String,
    access_token: String,
}

impl RunnerIdentity {
    pub fn new(
        runner_name: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            runner_name: runner_name.into(),
            owner: owner.into(),
            repo: repo.into(),
            access_token: access_token.into(),
        }
    }

    /// Generate a fresh identity. A missing or empty access token is a
    /// configuration error.
    pub fn generate(owner: &str, repo: &str, access_token: Option<&str>) -> Result<Self, ConfigurationError> {
        let access_token = access_token
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigurationError::MissingAccessToken {
                variable: variables::ACCESS_TOKEN,
            })?;
        Ok(Self::new(generate_runner_name(), owner, repo, access_token))
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl fmt::Debug for RunnerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnerIdentity")
            .field("runner_name", &self.runner_name)
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("access_token", &"***")
            .finish()
    }
}

/// `test-` followed by 8 random hex characters.
pub fn generate_runner_name() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{RUNNER_NAME_PREFIX}{}", &suffix[..RUNNER_NAME_SUFFIX_LEN])
}
