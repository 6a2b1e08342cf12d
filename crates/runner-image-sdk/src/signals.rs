// OS signal plumbing.
//
// The OS handlers do nothing but push a `ForwardedSignal` into a channel. Whoever
// owns the child process drains that channel and forwards the signal, which keeps
// process supervision testable without delivering real signals.

use anyhow::Result;
use std::fmt;
use tokio::sync::mpsc;

/// A cancellation request received from the operator or the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForwardedSignal {
    /// SIGINT / Ctrl-C.
    Interrupt,
    /// SIGTERM.
    Terminate,
}

impl fmt::Display for ForwardedSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForwardedSignal::Interrupt => write!(f, "SIGINT"),
            ForwardedSignal::Terminate => write!(f, "SIGTERM"),
        }
    }
}

#[cfg(unix)]
impl From<ForwardedSignal> for nix::sys::signal::Signal {
    fn from(signal: ForwardedSignal) -> Self {
        match signal {
            ForwardedSignal::Interrupt => nix::sys::signal::Signal::SIGINT,
            ForwardedSignal::Terminate => nix::sys::signal::Signal::SIGTERM,
        }
    }
}

pub type SignalSender = mpsc::UnboundedSender<ForwardedSignal>;
pub type SignalReceiver = mpsc::UnboundedReceiver<ForwardedSignal>;

/// Create a signal channel not connected to any OS handler.
pub fn signal_channel() -> (SignalSender, SignalReceiver) {
    mpsc::unbounded_channel()
}

/// Installs interrupt and termination handlers that feed a `SignalReceiver`.
pub struct SignalListener;

impl SignalListener {
    /// Install the handlers. Must be called from inside a Tokio runtime.
    ///
    /// The handlers stay installed for the rest of the process, so a second
    /// Ctrl-C no longer kills the parent; it is forwarded like the first.
    pub fn install() -> Result<SignalReceiver> {
        let (tx, rx) = signal_channel();

        let interrupt_tx = tx.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupted");
                if interrupt_tx.send(ForwardedSignal::Interrupt).is_err() {
                    break;
                }
            }
        });

        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
            tokio::spawn(async move {
                while sigterm.recv().await.is_some() {
                    tracing::info!("terminated");
                    if tx.send(ForwardedSignal::Terminate).is_err() {
                        break;
                    }
                }
            });
        }
        #[cfg(not(unix))]
        drop(tx);

        Ok(rx)
    }
}

/// Deliver `signal` to the process with id `pid`.
#[cfg(unix)]
pub fn send_to_process(pid: u32, signal: ForwardedSignal) -> Result<()> {
    let pid = i32::try_from(pid)?;
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid), nix::sys::signal::Signal::from(signal))?;
    Ok(())
}
