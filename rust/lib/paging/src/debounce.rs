use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// How long the search box must stay unchanged before its text is committed.
pub const SEARCH_QUIESCENCE: Duration = Duration::from_millis(400);

/// Trailing-edge debouncer.
///
/// Each [`input`](Debouncer::input) replaces the single pending timer; the
/// value is delivered on the commit channel only once `delay` passes with
/// no further input. Dropping the debouncer cancels the pending timer, so
/// nothing is committed after teardown.
///
/// Must be used from within a tokio runtime.
pub struct Debouncer<T> {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
    commits: mpsc::UnboundedSender<T>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Create a debouncer and the receiver its commits arrive on.
    pub fn new(delay: Duration) -> (Self, mpsc::UnboundedReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let debouncer = Self {
            delay,
            pending: Mutex::new(None),
            commits: tx,
        };
        (debouncer, rx)
    }

    /// Record a new value and restart the quiescence timer.
    pub fn input(&self, value: T) {
        let tx = self.commits.clone();
        let delay = self.delay;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver gone means the consumer was torn down; nothing to do.
            let _ = tx.send(value);
        });

        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = pending.replace(timer) {
            previous.abort();
        }
    }

    /// Drop the pending value, if any, without committing it.
    pub fn cancel(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = pending.take() {
            previous.abort();
        }
    }

    /// Whether a value is waiting for quiescence.
    pub fn is_pending(&self) -> bool {
        let pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.as_ref().is_some_and(|timer| !timer.is_finished())
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        let pending = self.pending.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(timer) = pending.take() {
            timer.abort();
        }
    }
}
