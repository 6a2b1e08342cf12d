// Container engine seam: command construction and the engine/process traits.

pub mod commands;
pub mod engine;

pub use engine::{wait_forwarding, CliContainerEngine, ContainerEngine, ContainerProcess};
