// Replaces registered secret values (the registry access token) in anything
// about to be printed or logged.

use parking_lot::RwLock;
use std::sync::Arc;

/// Replacement text used when a secret is found.
pub const MASK: &str = "***";

/// A thread-safe, cheaply clonable set of secret values.
#[derive(Debug, Clone, Default)]
pub struct SecretMasker {
    secrets: Arc<RwLock<Vec<String>>>,
}

impl SecretMasker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a secret. Empty or whitespace-only values are ignored.
    pub fn add_value(&self, secret: &str) {
        let trimmed = secret.trim();
        if trimmed.is_empty() {
            return;
        }

        let mut secrets = self.secrets.write();
        if !secrets.iter().any(|s| s == trimmed) {
            secrets.push(trimmed.to_string());
            // Longest first, so a secret that contains another is masked whole.
            secrets.sort_by(|a, b| b.len().cmp(&a.len()));
        }
    }

    /// Replace every registered secret in `input` with `***`.
    pub fn mask_secrets(&self, input: &str) -> String {
        let secrets = self.secrets.read();
        let mut result = input.to_string();
        for secret in secrets.iter() {
            if result.contains(secret.as_str()) {
                result = result.replace(secret.as_str(), MASK);
            }
        }
        result
    }
}
