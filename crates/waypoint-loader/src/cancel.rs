//! Cooperative cancellation for in-flight loads

use tokio::sync::watch;

/// Hand-off pair: the runner keeps the [`CancelHandle`], the spawned load
/// observes the [`CancelSignal`].
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

/// Owner side of a cancellation pair
///
/// Dropping the handle also cancels, so a load can never outlive the
/// navigation that started it.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        // Receivers may already be gone; that is fine.
        let _ = self.tx.send(true);
    }
}

impl Drop for CancelHandle {
    fn drop(&mut self) {
        let _ = self.tx.send(true);
    }
}

/// Observer side of a cancellation pair
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves when cancellation is requested
    pub async fn cancelled(&mut self) {
        // wait_for errs only when the sender is dropped, which also means
        // cancelled.
        let _ = self.rx.wait_for(|cancelled| *cancelled).await;
    }
}
