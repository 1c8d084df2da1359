//! Exactly-once completion acknowledgment
//!
//! The push transport gives each delivery a deadline. A delivery that is not
//! acknowledged in time counts as dropped and may be retried, which would
//! ring the user twice. [`Completion`] makes the acknowledgment impossible to
//! skip: it fires when [`Completion::complete`] is called, or otherwise when
//! the value is dropped, on every exit path including unwinding, and never
//! more than once.

use std::fmt;

use tokio::sync::oneshot;

type Callback = Box<dyn FnOnce() + Send + 'static>;

/// "Delivery handled" signal owed to the push transport
pub struct Completion {
    callback: Option<Callback>,
}

impl Completion {
    /// Wrap the transport's completion callback
    pub fn new<F>(callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            callback: Some(Box::new(callback)),
        }
    }

    /// A completion nobody is waiting for
    pub fn noop() -> Self {
        Self { callback: None }
    }

    /// A completion paired with a receiver that resolves once it fires
    pub fn channel() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        let completion = Self::new(move || {
            let _ = tx.send(());
        });
        (completion, rx)
    }

    /// Acknowledge the delivery now
    pub fn complete(mut self) {
        self.fire();
    }

    /// Whether the acknowledgment is still owed
    pub fn is_pending(&self) -> bool {
        self.callback.is_some()
    }

    fn fire(&mut self) {
        if let Some(callback) = self.callback.take() {
            callback();
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.fire();
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("pending", &self.is_pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counted() -> (Completion, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (Completion::new(move || { c.fetch_add(1, Ordering::SeqCst); }), count)
    }

    #[test]
    fn test_complete_fires_once() {
        let (completion, count) = counted();
        assert!(completion.is_pending());
        completion.complete();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_fires_once() {
        let (completion, count) = counted();
        drop(completion);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fires_during_unwind() {
        let (completion, count) = counted();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = completion;
            panic!("presenter blew up");
        }));
        assert!(result.is_err());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_channel_resolves() {
        let (completion, rx) = Completion::channel();
        completion.complete();
        assert!(rx.await.is_ok());
    }
}
