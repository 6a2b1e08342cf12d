// runner-image-sdk: Foundation layer for the runner image tooling.
// This crate has no dependencies on other workspace crates and provides the
// trace, process and signal primitives the build and verify flows sit on.

pub mod build_constants;
pub mod process_invoker;
pub mod signals;
pub mod trace;
pub mod which_util;

// Re-export commonly used items at crate root
pub use build_constants::{Package, Source};
pub use process_invoker::{ChildProcess, ProcessCommand, ProcessExitCodeError, ProcessInvoker};
pub use signals::{signal_channel, ForwardedSignal, SignalListener, SignalReceiver, SignalSender};
pub use trace::{CollectingTraceWriter, NullTraceWriter, TraceLevel, TraceWriter};
pub use which_util::WhichUtil;
