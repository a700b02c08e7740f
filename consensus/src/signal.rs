//! One-shot shutdown signal
//!
//! Closing is idempotent: the first `close` flips the flag and wakes every
//! listener, later calls are no-ops.

use std::sync::Arc;
use tokio::sync::watch;

/// Closer side of the shutdown signal
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    /// Create an open signal
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Close the signal
    ///
    /// Returns `true` only for the call that actually closed it.
    pub fn close(&self) -> bool {
        self.tx.send_if_modified(|closed| {
            if *closed {
                false
            } else {
                *closed = true;
                true
            }
        })
    }

    /// Whether the signal has been closed
    pub fn is_closed(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait until the signal is closed
    pub async fn closed(&self) {
        self.listener().closed().await
    }

    /// New listener observing this signal
    pub fn listener(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }
}

/// Observer side of the shutdown signal
#[derive(Debug, Clone)]
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl ShutdownListener {
    /// Whether the signal has been closed
    pub fn is_closed(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the signal is closed
    pub async fn closed(&mut self) {
        loop {
            let closed = *self.rx.borrow_and_update();
            if closed {
                return;
            }
            // Every closer is gone, so the signal can no longer change
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}
