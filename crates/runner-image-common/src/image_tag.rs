// Image tag resolution: distribution, version and architecture in, canonical
// image reference and engine platform out.

use crate::constants::IMAGE_NAME_PREFIX;
use crate::errors::ConfigurationError;
use std::fmt;
use std::str::FromStr;

/// Linux distributions with a Dockerfile under `image/<name>/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Distribution {
    Ubuntu,
    Debian,
}

impl Distribution {
    pub const ALL: [Distribution; 2] = [Distribution::Ubuntu, Distribution::Debian];

    /// Directory name under `image/` and component of the image name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Distribution::Ubuntu => "ubuntu",
            Distribution::Debian => "debian",
        }
    }

    fn supported() -> String {
        Self::ALL.iter().map(Distribution::as_str).collect::<Vec<_>>().join(", ")
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Distribution {
    type Err = ConfigurationError;

    /// Exact match against the directory names; `Ubuntu` is rejected like any
    /// other unknown name because it would not resolve to a Dockerfile.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| ConfigurationError::UnsupportedDistribution {
                name: s.to_string(),
                supported: Self::supported(),
            })
    }
}

/// Target CPU architecture of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Architecture {
    Amd64,
    Arm64,
}

impl Architecture {
    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::Amd64 => "amd64",
            Architecture::Arm64 => "arm64",
        }
    }

    /// Value for the engine's `--platform` flag.
    pub fn platform(&self) -> String {
        format!("linux/{}", self.as_str())
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Architecture {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "amd64" | "x64" | "x86_64" => Ok(Architecture::Amd64),
            "arm64" | "aarch64" => Ok(Architecture::Arm64),
            _ => Err(ConfigurationError::UnsupportedArchitecture {
                name: s.to_string(),
                supported: "amd64 (x64, x86_64), arm64 (aarch64)".to_string(),
            }),
        }
    }
}

/// The build inputs that identify one image.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageSpec {
    pub distribution: Distribution,
    pub version: String,
    pub architecture: Option<Architecture>,
}

impl ImageSpec {
    pub fn new(
        distribution: Distribution,
        version: impl Into<String>,
        architecture: Option<Architecture>,
    ) -> Self {
        Self {
            distribution,
            version: version.into(),
            architecture,
        }
    }

    /// Canonical image reference.
    ///
    /// The architecture goes into the repository name rather than the tag so
    /// that no version string can make two different specs collide.
    pub fn tag(&self) -> String {
        match self.architecture {
            Some(arch) => format!(
                "{IMAGE_NAME_PREFIX}{}-{}:{}",
                self.distribution, arch, self.version
            ),
            None => format!("{IMAGE_NAME_PREFIX}{}:{}", self.distribution, self.version),
        }
    }

    /// `--platform` value, when an architecture was requested.
    pub fn platform(&self) -> Option<String> {
        self.architecture.map(|a| a.platform())
    }
}
