//! Cancellation token shared between a scan driver and its background tasks.
//!
//! Cancelling is sticky: once set it never clears. Tasks either poll
//! [`CancellationToken::is_cancelled`] or await [`CancellationToken::cancelled`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// A cancellation token for cooperative shutdown of scan tasks.
///
/// Clones share state. Cancelling any clone wakes every waiter.
///
/// # Example
///
/// ```
/// use glyphguard_core::cancel::CancellationToken;
///
/// let token = CancellationToken::new();
/// let for_timer = token.clone();
///
/// token.cancel();
/// assert!(for_timer.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    /// Create a new token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation and wake all waiters.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Wait until cancellation is requested.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}
