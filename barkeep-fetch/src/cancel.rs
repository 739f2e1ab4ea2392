//! Crawl cancellation.
//!
//! A [`CancelHandle`] is owned by whoever may stop the crawl (the CLI's
//! Ctrl-C listener); every suspension point of a crawl holds a
//! [`CancelToken`]. Cancellation never interrupts a request already on the
//! wire: it is observed while waiting for a pacer slot, during retry
//! backoff and before each page.

use tokio::sync::watch;

/// Owner side of a crawl cancellation signal.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Creates an un-cancelled handle.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Returns a token observing this handle.
    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }

    /// Requests cancellation. No further request is dispatched.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Returns true once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side of a crawl cancellation signal.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token that is never cancelled.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    /// Returns true once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Completes once cancellation is requested.
    ///
    /// Never completes if the handle is dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
