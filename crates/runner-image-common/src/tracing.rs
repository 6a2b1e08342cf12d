// Named trace sources that mask secrets before anything reaches the log.

use crate::secret_masker::SecretMasker;
use runner_image_sdk::TraceWriter;

/// A trace source for one component (`build`, `test`, `registry`, ...).
///
/// Every message runs through the shared `SecretMasker` and is then emitted
/// through the `tracing` macros with the component name attached.
#[derive(Debug, Clone)]
pub struct Tracing {
    name: String,
    secret_masker: SecretMasker,
}

impl Tracing {
    pub fn new(name: impl Into<String>, secret_masker: SecretMasker) -> Self {
        Self {
            name: name.into(),
            secret_masker,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Log an error together with its source chain.
    pub fn error_chain(&self, err: &anyhow::Error) {
        self.error(&format!("{err:#}"));
    }
}

impl TraceWriter for Tracing {
    fn info(&self, message: &str) {
        let masked = self.secret_masker.mask_secrets(message);
        tracing::info!("[{}] {}", self.name, masked);
    }

    fn verbose(&self, message: &str) {
        let masked = self.secret_masker.mask_secrets(message);
        tracing::debug!("[{}] {}", self.name, masked);
    }

    fn warning(&self, message: &str) {
        let masked = self.secret_masker.mask_secrets(message);
        tracing::warn!("[{}] {}", self.name, masked);
    }

    fn error(&self, message: &str) {
        let masked = self.secret_masker.mask_secrets(message);
        tracing::error!("[{}] {}", self.name, masked);
    }
}

/// Hands out trace sources that share one `SecretMasker`.
#[derive(Debug, Clone, Default)]
pub struct TraceManager {
    secret_masker: SecretMasker,
}

impl TraceManager {
    pub fn new(secret_masker: SecretMasker) -> Self {
        Self { secret_masker }
    }

    pub fn get(&self, name: &str) -> Tracing {
        Tracing::new(name, self.secret_masker.clone())
    }

    pub fn secret_masker(&self) -> &SecretMasker {
        &self.secret_masker
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sources_share_the_masker() {
        let manager = TraceManager::default();
        let build = manager.get("build");
        manager.secret_masker().add_value("tok");
        assert_eq!(build.name(), "build");
        assert_eq!(build.secret_masker.mask_secrets("a tok b"), "a *** b");
    }

    #[test]
    fn logging_does_not_panic_without_subscriber() {
        let trace = TraceManager::default().get("test");
        trace.info("info");
        trace.verbose("verbose");
        trace.warning("warning");
        trace.error_chain(&anyhow::anyhow!("outer").context("ctx"));
    }
}
