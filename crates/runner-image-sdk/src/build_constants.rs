// Build constants baked into the binaries at compile time.

/// Source control information.
pub struct Source;

impl Source {
    /// Commit the binary was built from, taken from `RUNNER_IMAGE_COMMIT_HASH`
    /// at compile time.
    pub const COMMIT_HASH: &'static str = match option_env!("RUNNER_IMAGE_COMMIT_HASH") {
        Some(h) => h,
        None => "N/A",
    };
}

/// Package metadata.
#[derive(Debug, Clone)]
pub struct Package;

impl Package {
    pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    pub const NAME: &'static str = "github-actions-self-hosted-runner-container";

    /// Value sent as `User-Agent` on registry requests.
    pub fn user_agent() -> String {
        format!("{}/{}", Self::NAME, Self::VERSION)
    }
}
