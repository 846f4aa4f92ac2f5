//! Cooperative cancellation shared between the UI loop and background tasks.

use std::sync::Arc;

use tokio::sync::watch;

/// A clonable cancellation flag that can also be awaited.
///
/// All clones observe the same flag. Once cancelled it stays cancelled;
/// create a fresh token for the next run.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use sqlscope::CancelToken;
///
/// # tokio_test::block_on(async {
/// let token = CancelToken::new();
/// token.clone().cancel();
/// assert!(!token.sleep(Duration::from_secs(60)).await);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Set the flag and wake every waiter.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once the token has been cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // Errors only once the sender is dropped, and `self` holds it
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Sleep for `duration`, returning `false` if cancelled first.
    pub async fn sleep(&self, duration: std::time::Duration) -> bool {
        tokio::select! {
            _ = self.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_wakes_waiter() {
        let token = CancelToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });

        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_interrupted() {
        let token = CancelToken::new();
        let sleeper = token.clone();
        let handle = tokio::spawn(async move { sleeper.sleep(Duration::from_secs(60)).await });

        tokio::task::yield_now().await;
        token.cancel();
        assert!(!handle.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_completes() {
        let token = CancelToken::new();
        assert!(token.sleep(Duration::from_millis(500)).await);
    }

    #[tokio::test]
    async fn test_already_cancelled_resolves_immediately() {
        let token = CancelToken::new();
        token.cancel();
        tokio::time::timeout(Duration::from_millis(100), token.cancelled()).await.unwrap();
    }
}
