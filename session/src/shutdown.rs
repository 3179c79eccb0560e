//! Teardown coordination for a proctoring session.
//!
//! The controller loop and the host bridge subscribe to one broadcast
//! channel. The first cause to arrive (page exit, SIGINT or SIGTERM) is
//! recorded and broadcast; later ones are ignored, so every task tears
//! down for the same reason.

use std::sync::OnceLock;

use tokio::signal;
use tokio::sync::broadcast;

/// Why a session is being torn down without a submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownCause {
    /// The host left the exam page or dropped the session.
    PageExit,
    /// SIGINT.
    Interrupt,
    /// SIGTERM.
    Terminate,
}

impl ShutdownCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PageExit => "page_exit",
            Self::Interrupt => "sigint",
            Self::Terminate => "sigterm",
        }
    }
}

/// One-shot teardown trigger shared by a session's background tasks.
pub struct ShutdownController {
    tx: broadcast::Sender<ShutdownCause>,
    cause: OnceLock<ShutdownCause>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            cause: OnceLock::new(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ShutdownCause> {
        self.tx.subscribe()
    }

    /// Record `cause` and notify subscribers. Returns `false` if teardown was
    /// already triggered, in which case nothing is sent.
    pub fn shutdown(&self, cause: ShutdownCause) -> bool {
        if self.cause.set(cause).is_err() {
            return false;
        }
        tracing::debug!(cause = cause.as_str(), "session teardown triggered");
        let _ = self.tx.send(cause);
        true
    }

    /// The cause that won, once teardown has been triggered.
    pub fn cause(&self) -> Option<ShutdownCause> {
        self.cause.get().copied()
    }

    /// Wait for SIGTERM or SIGINT, then trigger teardown.
    pub async fn wait_for_signal(&self) {
        let ctrl_c = signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        let cause = tokio::select! {
            _ = ctrl_c => ShutdownCause::Interrupt,
            _ = terminate => ShutdownCause::Terminate,
        };
        tracing::info!(cause = cause.as_str(), "signal received, leaving session");
        self.shutdown(cause);
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_the_cause() {
        let controller = ShutdownController::new();
        let mut rx1 = controller.subscribe();
        let mut rx2 = controller.subscribe();
        assert!(controller.shutdown(ShutdownCause::PageExit));
        assert_eq!(rx1.recv().await.unwrap(), ShutdownCause::PageExit);
        assert_eq!(rx2.recv().await.unwrap(), ShutdownCause::PageExit);
    }

    #[tokio::test]
    async fn first_cause_wins() {
        let controller = ShutdownController::new();
        let mut rx = controller.subscribe();
        assert!(controller.cause().is_none());

        assert!(controller.shutdown(ShutdownCause::Terminate));
        assert!(!controller.shutdown(ShutdownCause::PageExit));

        assert_eq!(controller.cause(), Some(ShutdownCause::Terminate));
        assert_eq!(rx.recv().await.unwrap(), ShutdownCause::Terminate);
        assert!(rx.try_recv().is_err());
    }
}
