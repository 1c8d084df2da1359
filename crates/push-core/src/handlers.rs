//! Transport event handlers and the runtime that wires them
//!
//! Each handler owns one concern and is registered on the
//! [`TransportEventBus`] for the event kinds it serves:
//!
//! - [`IncomingPushHandler`] - classify a VoIP push, drive the presenter,
//!   acknowledge the transport
//! - [`TokenLifecycleHandler`] - forward credential updates and invalidations
//! - [`ForegroundPresentationHandler`] - answer foreground notifications
//!
//! # Architecture
//!
//! ```text
//! push transport ──► TransportEventBus ──► IncomingPushHandler ──► classify ──► PresenterSlot
//!                           │                      └──────────── Completion (always)
//!                           ├──► TokenLifecycleHandler ──► TokenForwarder ──► presenter + TokenStore
//!                           └──► ForegroundPresentationHandler ──► reply
//! ```
//!
//! # Usage Examples
//!
//! ```rust
//! use rvoip_push_core::{Completion, PushConfig, PushRuntime, RawPushPayload, TransportEvent};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let runtime = PushRuntime::from_config(&PushConfig::default()).unwrap();
//!
//! // No presenter installed yet: the push is still acknowledged
//! let (completion, acked) = Completion::channel();
//! let payload = RawPushPayload::from_value(json!({ "nameCaller": "Bob" }));
//! runtime.bus().dispatch(TransportEvent::incoming_push(payload, completion)).await;
//! assert!(acked.await.is_ok());
//! # });
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::ack::Completion;
use crate::call_event::{CallDefaults, PushEvent};
use crate::classifier::{classify_with, new_call_id, Classification};
use crate::config::{PushConfig, DEFAULT_PRESENTER_TIMEOUT_MS};
use crate::error::{PushError, Result};
use crate::events::{
    PresentationOptions, TransportEvent, TransportEventBus, TransportEventHandler, TransportEventKind,
};
use crate::payload::RawPushPayload;
use crate::presenter::PresenterSlot;
use crate::token::{JsonFileTokenStore, MemoryTokenStore, TokenForwarder, TokenStore};

/// What happened to one incoming push
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// All active calls were ended
    CallsEnded,
    /// The incoming-call UI was shown for this call id
    CallPresented { call_id: String },
    /// No presenter was installed; nothing was forwarded
    PresenterUnavailable,
    /// The presenter rejected the request
    PresenterFailed { reason: String },
}

/// Classifies VoIP pushes and hands them to the call presenter
pub struct IncomingPushHandler {
    presenter: PresenterSlot,
    defaults: CallDefaults,
    timeout: Duration,
}

impl IncomingPushHandler {
    pub fn new(presenter: PresenterSlot, defaults: CallDefaults) -> Self {
        Self {
            presenter,
            defaults,
            timeout: Duration::from_millis(DEFAULT_PRESENTER_TIMEOUT_MS),
        }
    }

    /// Bound how long one presenter call may hold back the acknowledgment
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Classify `payload`, forward it, then acknowledge
    ///
    /// The acknowledgment is sent on every path: after success, after a
    /// presenter error or timeout, and (through `Completion`'s drop) if the
    /// presenter panics.
    pub async fn handle_push(&self, payload: RawPushPayload, completion: Completion) -> DispatchOutcome {
        let report = classify_with(&payload, &self.defaults, new_call_id);
        log_defaults(&report);

        let outcome = match report.event {
            PushEvent::Cancel(_) => {
                info!("Cancel call push received, ending all calls");
                let result = self.bounded("end_all_calls", self.presenter.end_all_calls()).await;
                settle(result, DispatchOutcome::CallsEnded)
            }
            PushEvent::IncomingCall(call) => {
                let call_id = call.id().to_string();
                info!(call_id = %call_id, caller = %call.name_caller(), video = call.is_video(), "Incoming call push");
                let result = self
                    .bounded("show_incoming_call", self.presenter.show_incoming_call(call, true))
                    .await;
                settle(result, DispatchOutcome::CallPresented { call_id })
            }
        };

        completion.complete();
        outcome
    }

    async fn bounded(&self, operation: &str, call: impl Future<Output = Result<()>>) -> Result<()> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(PushError::presenter(format!(
                "{} did not finish within {:?}",
                operation, self.timeout
            ))),
        }
    }
}

fn log_defaults(report: &Classification) {
    if report.notes.is_empty() {
        return;
    }
    let mistyped: Vec<&str> = report.mistyped().map(|n| n.field).collect();
    if mistyped.is_empty() {
        debug!(defaulted = report.notes.len(), "Push fields defaulted");
    } else {
        info!(defaulted = report.notes.len(), ?mistyped, "Push had malformed fields, defaults applied");
    }
}

fn settle(result: Result<()>, success: DispatchOutcome) -> DispatchOutcome {
    match result {
        Ok(()) => success,
        Err(PushError::PresenterUnavailable) => {
            debug!("No call presenter installed, push not forwarded");
            DispatchOutcome::PresenterUnavailable
        }
        Err(e) => {
            warn!("Call presenter failed: {}", e);
            DispatchOutcome::PresenterFailed { reason: e.to_string() }
        }
    }
}

#[async_trait]
impl TransportEventHandler for IncomingPushHandler {
    async fn handle(&self, event: TransportEvent) {
        match event {
            TransportEvent::IncomingPush { payload, completion } => {
                self.handle_push(payload, completion).await;
            }
            other => debug!(kind = %other.kind(), "Ignoring event not meant for the push handler"),
        }
    }
}

/// Routes credential updates and invalidations to a [`TokenForwarder`]
pub struct TokenLifecycleHandler {
    forwarder: Arc<TokenForwarder>,
}

impl TokenLifecycleHandler {
    pub fn new(forwarder: Arc<TokenForwarder>) -> Self {
        Self { forwarder }
    }
}

#[async_trait]
impl TransportEventHandler for TokenLifecycleHandler {
    async fn handle(&self, event: TransportEvent) {
        match event {
            TransportEvent::CredentialsUpdated { credentials } => {
                self.forwarder.on_credentials_updated(&credentials).await;
            }
            TransportEvent::TokenInvalidated => {
                self.forwarder.on_token_invalidated().await;
            }
            other => debug!(kind = %other.kind(), "Ignoring event not meant for the token handler"),
        }
    }
}

/// Answers foreground notifications with fixed presentation options
pub struct ForegroundPresentationHandler {
    options: PresentationOptions,
}

impl ForegroundPresentationHandler {
    pub fn new(options: PresentationOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl TransportEventHandler for ForegroundPresentationHandler {
    async fn handle(&self, event: TransportEvent) {
        match event {
            TransportEvent::ForegroundNotification { reply, .. } => {
                if reply.send(self.options).is_err() {
                    debug!("Foreground notification reply dropped by the transport");
                }
            }
            other => debug!(kind = %other.kind(), "Ignoring event not meant for the foreground handler"),
        }
    }
}

/// The push pipeline: a bus with every handler registered
pub struct PushRuntime {
    bus: Arc<TransportEventBus>,
    presenter: PresenterSlot,
    tokens: Arc<TokenForwarder>,
    incoming: Arc<IncomingPushHandler>,
}

impl PushRuntime {
    /// Wire the handlers around an injected presenter slot and token store
    pub fn new(config: &PushConfig, presenter: PresenterSlot, store: Arc<dyn TokenStore>) -> Self {
        let bus = Arc::new(TransportEventBus::new());
        let tokens = Arc::new(TokenForwarder::new(
            presenter.clone(),
            store,
            config.token_store_key.clone(),
        ));
        let incoming = Arc::new(
            IncomingPushHandler::new(presenter.clone(), config.call_defaults.clone())
                .with_timeout(config.presenter_timeout()),
        );
        let token_handler = Arc::new(TokenLifecycleHandler::new(tokens.clone()));

        bus.register(TransportEventKind::IncomingPush, incoming.clone());
        bus.register(TransportEventKind::CredentialsUpdated, token_handler.clone());
        bus.register(TransportEventKind::TokenInvalidated, token_handler);
        bus.register(
            TransportEventKind::ForegroundNotification,
            Arc::new(ForegroundPresentationHandler::new(config.foreground)),
        );

        Self {
            bus,
            presenter,
            tokens,
            incoming,
        }
    }

    /// Build with an empty presenter slot and the configured token store
    pub fn from_config(config: &PushConfig) -> Result<Self> {
        config.validate()?;
        let store: Arc<dyn TokenStore> = match &config.token_store_path {
            Some(path) => Arc::new(JsonFileTokenStore::new(path)),
            None => Arc::new(MemoryTokenStore::new()),
        };
        Ok(Self::new(config, PresenterSlot::empty(), store))
    }

    pub fn bus(&self) -> &Arc<TransportEventBus> {
        &self.bus
    }

    pub fn presenter(&self) -> &PresenterSlot {
        &self.presenter
    }

    pub fn tokens(&self) -> &Arc<TokenForwarder> {
        &self.tokens
    }

    /// Handle one push directly, bypassing the bus, and report the outcome
    pub async fn handle_push(&self, payload: RawPushPayload, completion: Completion) -> DispatchOutcome {
        self.incoming.handle_push(payload, completion).await
    }
}

impl std::fmt::Debug for PushRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushRuntime")
            .field("bus", &self.bus)
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}
