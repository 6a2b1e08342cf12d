// Configuration errors reported to the operator before any engine work.

use thiserror::Error;

/// An input or environment problem that stops the run before the container
/// engine is invoked.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("unsupported distribution: {name}\nsupported distributions: {supported}")]
    UnsupportedDistribution { name: String, supported: String },

    #[error("unsupported architecture: {name}\nsupported architectures: {supported}")]
    UnsupportedArchitecture { name: String, supported: String },

    #[error("{variable} is required")]
    MissingAccessToken { variable: &'static str },

    #[error("container engine '{engine}' not found: {reason}")]
    EngineNotFound { engine: String, reason: String },

    #[error("repository root not found: no '{marker}' directory above {start}")]
    RepositoryRootNotFound { marker: &'static str, start: String },

    #[error("unknown example image: {name}\nknown examples: {known}")]
    UnknownExample { name: String, known: String },
}
