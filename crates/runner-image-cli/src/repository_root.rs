// Locates the repository root: the directory holding `image/<distro>/Dockerfile`
// and `examples/`.

use runner_image_common::constants::IMAGE_DIRECTORY;
use runner_image_common::ConfigurationError;
use std::path::{Path, PathBuf};

/// Resolve the repository root.
///
/// An explicit directory wins. Otherwise the first ancestor of the current
/// directory that contains `image/`, then the first such ancestor of the
/// directory this crate was built from.
pub fn resolve(explicit: Option<&Path>) -> Result<PathBuf, ConfigurationError> {
    if let Some(root) = explicit {
        return if root.join(IMAGE_DIRECTORY).is_dir() {
            Ok(root.to_path_buf())
        } else {
            Err(not_found(root))
        };
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_upwards(&cwd)
        .or_else(|| find_upwards(Path::new(env!("CARGO_MANIFEST_DIR"))))
        .ok_or_else(|| not_found(&cwd))
}

/// First of `start` and its ancestors that contains `image/`.
pub fn find_upwards(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(IMAGE_DIRECTORY).is_dir())
        .map(Path::to_path_buf)
}

fn not_found(start: &Path) -> ConfigurationError {
    ConfigurationError::RepositoryRootNotFound {
        marker: IMAGE_DIRECTORY,
        start: start.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn finds_root_from_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("image/ubuntu")).unwrap();
        let nested = dir.path().join("examples/add_scripts");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_upwards(&nested), Some(dir.path().to_path_buf()));
        assert_eq!(find_upwards(dir.path()), Some(dir.path().to_path_buf()));
    }

    #[test]
    fn file_named_image_does_not_count() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("image"), "").unwrap();
        let found = find_upwards(dir.path());
        assert_ne!(found.as_deref(), Some(dir.path()));
    }

    #[test]
    fn explicit_root_is_validated() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve(Some(dir.path())).unwrap_err();
        assert!(matches!(err, ConfigurationError::RepositoryRootNotFound { marker: "image", .. }));

        fs::create_dir(dir.path().join("image")).unwrap();
        assert_eq!(resolve(Some(dir.path())).unwrap(), dir.path());
    }
}
