//! Typed dispatch of push transport events
//!
//! Everything the push transport tells the application arrives as a
//! [`TransportEvent`]. Each [`TransportEventKind`] has at most one handler
//! registered on the [`TransportEventBus`]; the bus routes every event to
//! its kind's handler and nothing else.
//!
//! An event nobody handles is dropped. Dropping is still safe for incoming
//! pushes, because their [`Completion`] acknowledges on drop, and for
//! foreground notifications, whose reply channel simply closes so the
//! platform falls back to its own presentation.
//!
//! # Usage Examples
//!
//! ## Registering a closure
//!
//! ```rust
//! use rvoip_push_core::events::{handler_fn, TransportEvent, TransportEventBus, TransportEventKind};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let bus = TransportEventBus::new();
//! let seen = Arc::new(AtomicUsize::new(0));
//!
//! let counter = seen.clone();
//! bus.register(
//!     TransportEventKind::TokenInvalidated,
//!     handler_fn(move |_event| {
//!         let counter = counter.clone();
//!         async move {
//!             counter.fetch_add(1, Ordering::SeqCst);
//!         }
//!     }),
//! );
//!
//! assert!(bus.dispatch(TransportEvent::TokenInvalidated).await);
//! assert!(!bus.dispatch(TransportEvent::CredentialsUpdated { credentials: vec![1] }).await);
//! assert_eq!(seen.load(Ordering::SeqCst), 1);
//! # });
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::ack::Completion;
use crate::payload::RawPushPayload;

/// How a notification arriving in the foreground should be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationOptions {
    pub alert: bool,
    pub badge: bool,
    pub sound: bool,
}

impl Default for PresentationOptions {
    fn default() -> Self {
        Self {
            alert: true,
            badge: true,
            sound: true,
        }
    }
}

impl PresentationOptions {
    /// Show nothing
    pub fn none() -> Self {
        Self {
            alert: false,
            badge: false,
            sound: false,
        }
    }
}

/// Events delivered by the push transport
pub enum TransportEvent {
    /// A new VoIP credential was issued
    CredentialsUpdated {
        /// Raw credential bytes
        credentials: Vec<u8>,
    },
    /// The current VoIP credential is no longer valid
    TokenInvalidated,
    /// A VoIP push arrived
    IncomingPush {
        /// The untyped payload
        payload: RawPushPayload,
        /// Acknowledgment owed to the transport
        completion: Completion,
    },
    /// A regular notification arrived while the app is in the foreground
    ForegroundNotification {
        /// The notification's user info
        payload: RawPushPayload,
        /// Where the chosen presentation goes
        reply: oneshot::Sender<PresentationOptions>,
    },
}

impl TransportEvent {
    /// Build an incoming push event
    pub fn incoming_push(payload: RawPushPayload, completion: Completion) -> Self {
        TransportEvent::IncomingPush { payload, completion }
    }

    /// Build a foreground notification event and the receiver for its answer
    pub fn foreground(payload: RawPushPayload) -> (Self, oneshot::Receiver<PresentationOptions>) {
        let (reply, rx) = oneshot::channel();
        (TransportEvent::ForegroundNotification { payload, reply }, rx)
    }

    pub fn kind(&self) -> TransportEventKind {
        match self {
            TransportEvent::CredentialsUpdated { .. } => TransportEventKind::CredentialsUpdated,
            TransportEvent::TokenInvalidated => TransportEventKind::TokenInvalidated,
            TransportEvent::IncomingPush { .. } => TransportEventKind::IncomingPush,
            TransportEvent::ForegroundNotification { .. } => TransportEventKind::ForegroundNotification,
        }
    }
}

impl fmt::Debug for TransportEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportEvent::CredentialsUpdated { credentials } => f
                .debug_struct("CredentialsUpdated")
                .field("len", &credentials.len())
                .finish(),
            TransportEvent::TokenInvalidated => f.write_str("TokenInvalidated"),
            TransportEvent::IncomingPush { payload, completion } => f
                .debug_struct("IncomingPush")
                .field("keys", &payload.len())
                .field("completion", completion)
                .finish(),
            TransportEvent::ForegroundNotification { payload, .. } => f
                .debug_struct("ForegroundNotification")
                .field("keys", &payload.len())
                .finish(),
        }
    }
}

/// Discriminant of [`TransportEvent`], used as the routing key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportEventKind {
    CredentialsUpdated,
    TokenInvalidated,
    IncomingPush,
    ForegroundNotification,
}

impl TransportEventKind {
    pub const ALL: [TransportEventKind; 4] = [
        TransportEventKind::CredentialsUpdated,
        TransportEventKind::TokenInvalidated,
        TransportEventKind::IncomingPush,
        TransportEventKind::ForegroundNotification,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportEventKind::CredentialsUpdated => "credentials_updated",
            TransportEventKind::TokenInvalidated => "token_invalidated",
            TransportEventKind::IncomingPush => "incoming_push",
            TransportEventKind::ForegroundNotification => "foreground_notification",
        }
    }
}

impl fmt::Display for TransportEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives the events of one kind
#[async_trait]
pub trait TransportEventHandler: Send + Sync {
    async fn handle(&self, event: TransportEvent);
}

struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> TransportEventHandler for FnHandler<F>
where
    F: Fn(TransportEvent) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn handle(&self, event: TransportEvent) {
        (self.0)(event).await
    }
}

/// Adapt an async closure into a handler
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn TransportEventHandler>
where
    F: Fn(TransportEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

/// Routes transport events to one handler per kind
#[derive(Default)]
pub struct TransportEventBus {
    handlers: RwLock<HashMap<TransportEventKind, Arc<dyn TransportEventHandler>>>,
}

impl TransportEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the handler for `kind`, returning the one it replaces
    pub fn register(
        &self,
        kind: TransportEventKind,
        handler: Arc<dyn TransportEventHandler>,
    ) -> Option<Arc<dyn TransportEventHandler>> {
        let previous = self.handlers.write().insert(kind, handler);
        if previous.is_some() {
            debug!(%kind, "Replaced transport event handler");
        }
        previous
    }

    pub fn unregister(&self, kind: TransportEventKind) -> Option<Arc<dyn TransportEventHandler>> {
        self.handlers.write().remove(&kind)
    }

    pub fn has_handler(&self, kind: TransportEventKind) -> bool {
        self.handlers.read().contains_key(&kind)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Route `event` to its handler
    ///
    /// Returns `false` when no handler is registered for the event's kind,
    /// in which case the event is dropped.
    pub async fn dispatch(&self, event: TransportEvent) -> bool {
        let kind = event.kind();
        // Clone out of the lock; handlers may register others while running
        let handler = self.handlers.read().get(&kind).cloned();

        match handler {
            Some(handler) => {
                handler.handle(event).await;
                true
            }
            None => {
                warn!(%kind, "No handler registered, dropping transport event");
                false
            }
        }
    }
}

impl fmt::Debug for TransportEventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<_> = self.handlers.read().keys().copied().collect();
        f.debug_struct("TransportEventBus").field("kinds", &kinds).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_unhandled_incoming_push_is_still_acknowledged() {
        let bus = TransportEventBus::new();
        let (completion, rx) = Completion::channel();

        let delivered = bus
            .dispatch(TransportEvent::incoming_push(RawPushPayload::new(), completion))
            .await;

        assert!(!delivered);
        assert!(rx.await.is_ok());
    }

    #[tokio::test]
    async fn test_unhandled_foreground_closes_reply() {
        let bus = TransportEventBus::new();
        let (event, rx) = TransportEvent::foreground(RawPushPayload::new());
        bus.dispatch(event).await;
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn test_register_replaces_previous() {
        let bus = TransportEventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let first = handler_fn(|_| async {});
        assert!(bus.register(TransportEventKind::TokenInvalidated, first).is_none());

        let h = hits.clone();
        let second = handler_fn(move |_| {
            let h = h.clone();
            async move {
                h.fetch_add(1, Ordering::SeqCst);
            }
        });
        assert!(bus.register(TransportEventKind::TokenInvalidated, second).is_some());
        assert_eq!(bus.handler_count(), 1);

        bus.dispatch(TransportEvent::TokenInvalidated).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        assert!(bus.unregister(TransportEventKind::TokenInvalidated).is_some());
        assert!(!bus.has_handler(TransportEventKind::TokenInvalidated));
    }

    #[test]
    fn test_event_kinds() {
        let (event, _rx) = TransportEvent::foreground(RawPushPayload::new());
        assert_eq!(event.kind(), TransportEventKind::ForegroundNotification);
        assert_eq!(TransportEvent::TokenInvalidated.kind().as_str(), "token_invalidated");
    }
}
