//! Termination signal wait
//!
//! Handlers are registered by [`ShutdownSignals::install`], not on first
//! poll, so a signal that arrives while probes are still being attached is
//! queued for [`ShutdownSignals::recv`] instead of killing the process
//! before teardown can run.

use std::fmt;
use std::io;

use tokio::signal::unix::{signal, Signal, SignalKind};

/// Which request ended the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Interrupt,
    Terminate,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Termination::Interrupt => "SIGINT",
            Termination::Terminate => "SIGTERM",
        })
    }
}

/// SIGINT and SIGTERM streams, live from construction
pub struct ShutdownSignals {
    interrupt: Signal,
    terminate: Signal,
}

impl ShutdownSignals {
    /// Register both handlers. Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Returns an error if a signal handler cannot be installed.
    pub fn install() -> io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Resolve on the first SIGINT or SIGTERM received since [`install`].
    ///
    /// [`install`]: ShutdownSignals::install
    pub async fn recv(&mut self) -> Termination {
        tokio::select! {
            _ = self.interrupt.recv() => Termination::Interrupt,
            _ = self.terminate.recv() => Termination::Terminate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    #[allow(unsafe_code)]
    async fn test_signal_before_wait_is_not_lost() {
        let mut signals = ShutdownSignals::install().expect("install handlers");

        // Delivered before anyone waits, as during probe attachment
        assert_eq!(unsafe { libc::raise(libc::SIGTERM) }, 0);

        let termination = tokio::time::timeout(Duration::from_secs(5), signals.recv())
            .await
            .expect("queued SIGTERM should be received");
        assert_eq!(termination, Termination::Terminate);
    }

    #[test]
    fn test_termination_display() {
        assert_eq!(Termination::Interrupt.to_string(), "SIGINT");
        assert_eq!(Termination::Terminate.to_string(), "SIGTERM");
    }
}
