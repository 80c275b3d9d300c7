//! Cooperative cancellation.
//!
//! Mode tasks and long-running motion operations observe a [`CancelToken`]
//! at their suspension points and unwind cleanly when it fires. Tasks
//! return an exit status; cancellation is never signalled by unwinding.

use std::sync::Arc;

use tokio::sync::watch;

/// Owning side of a cancellation signal.
///
/// Dropping the source without calling [`CancelSource::cancel`] also
/// cancels outstanding tokens; an orphaned task has nothing left to serve.
#[derive(Debug)]
pub struct CancelSource {
    tx: watch::Sender<bool>,
}

/// Observer side of a cancellation signal. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
    // Keeps the channel open for tokens that must never fire.
    _hold: Option<Arc<watch::Sender<bool>>>,
}

impl CancelSource {
    /// Create a linked source/token pair.
    pub fn new() -> (CancelSource, CancelToken) {
        let (tx, rx) = watch::channel(false);
        (CancelSource { tx }, CancelToken { rx, _hold: None })
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

impl CancelToken {
    /// A token that never fires, for operations run outside any mode task
    /// (e.g. startup sequencing).
    pub fn none() -> CancelToken {
        let (tx, rx) = watch::channel(false);
        CancelToken {
            rx,
            _hold: Some(Arc::new(tx)),
        }
    }

    /// True once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves when cancellation is requested (or the source is gone).
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        let _ = rx.wait_for(|&cancelled| cancelled).await;
    }
}
