//! # rvoip-push-core - VoIP push normalization
//!
//! Turns the opaque payloads delivered by a VoIP push transport into typed
//! call events and routes them to the native call UI.
//!
//! ## Overview
//!
//! - **Payloads**: [`RawPushPayload`] wraps the untyped mapping the transport
//!   delivers; every read is defensive.
//! - **Classification**: [`classify`] is a pure function from a payload to a
//!   [`PushEvent`]: a cancellation, or an incoming call with every field
//!   populated.
//! - **Presentation**: the [`CallPresenter`] trait is the call UI; it is
//!   injected through a [`PresenterSlot`] that may be empty early on.
//! - **Acknowledgment**: a [`Completion`] is owed to the transport for every
//!   push and fires exactly once on every path.
//! - **Tokens**: [`TokenForwarder`] forwards VoIP token updates to the
//!   presenter and a persisted [`TokenStore`].
//! - **Dispatch**: [`TransportEventBus`] routes each kind of transport event
//!   to its handler; [`PushRuntime`] wires the standard handlers.
//!
//! ## Quick Start
//!
//! ```rust
//! use rvoip_push_core::{classify, PushEvent, RawPushPayload};
//! use serde_json::json;
//!
//! let payload = RawPushPayload::from_value(json!({ "nameCaller": "Bob" }));
//! match classify(&payload) {
//!     PushEvent::IncomingCall(call) => {
//!         assert_eq!(call.name_caller(), "Bob");
//!         assert_eq!(call.handle(), "Caller");
//!     }
//!     PushEvent::Cancel(_) => unreachable!(),
//! }
//! ```

pub mod ack;
pub mod call_event;
pub mod classifier;
pub mod config;
pub mod error;
pub mod events;
pub mod handlers;
pub mod logging;
pub mod payload;
pub mod presenter;
pub mod token;

pub use ack::Completion;
pub use call_event::{CallDefaults, CallEvent, CancelEvent, HandleType, PlatformOptions, PushEvent};
pub use classifier::{classify, classify_report, classify_with, Classification, FieldIssue, FieldNote, CANCEL_CALL};
pub use config::PushConfig;
pub use error::{PushError, Result};
pub use events::{
    handler_fn, PresentationOptions, TransportEvent, TransportEventBus, TransportEventHandler,
    TransportEventKind,
};
pub use handlers::{
    DispatchOutcome, ForegroundPresentationHandler, IncomingPushHandler, PushRuntime,
    TokenLifecycleHandler,
};
pub use payload::RawPushPayload;
pub use presenter::{CallPresenter, PresenterSlot};
pub use token::{JsonFileTokenStore, MemoryTokenStore, TokenForwarder, TokenStore, VoipToken};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
