// runner-image-common: Shared domain types and services for the runner image
// tooling. Depends on `runner-image-sdk`.

pub mod constants;
pub mod errors;
pub mod http_client_factory;
pub mod image_tag;
pub mod secret_masker;
pub mod tracing;

pub use constants::return_code;
pub use errors::ConfigurationError;
pub use http_client_factory::HttpClientFactory;
pub use image_tag::{Architecture, Distribution, ImageSpec};
pub use secret_masker::SecretMasker;
pub use crate::tracing::{TraceManager, Tracing};
