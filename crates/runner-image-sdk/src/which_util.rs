use std::path::PathBuf;

/// Locates executables on PATH.
pub struct WhichUtil;

impl WhichUtil {
    /// Locate `command` on PATH.
    ///
    /// With `require` set, a missing command is an error; otherwise `Ok(None)`.
    pub fn which(command: &str, require: bool) -> anyhow::Result<Option<PathBuf>> {
        if command.is_empty() {
            if require {
                anyhow::bail!("command must not be empty");
            }
            return Ok(None);
        }

        match which::which(command) {
            Ok(path) => Ok(Some(path)),
            Err(_) if !require => Ok(None),
            Err(e) => anyhow::bail!(
                "{command}: command not found ({e}). Make sure '{command}' is installed and its location included in the 'PATH' environment variable."
            ),
        }
    }
}
