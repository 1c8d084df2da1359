//! Push payload classification and normalization
//!
//! [`classify`] is the single piece of business logic in the push pipeline:
//! a total, side-effect-free function from a raw payload to a [`PushEvent`].
//!
//! 1. If the `type` field is exactly the string `"cancel_call"`, the payload
//!    is a cancellation and nothing else is read.
//! 2. Otherwise every call field is read defensively and replaced by its
//!    fixed default when missing or unusable. Platform options are
//!    defaulted per sub-field.
//!
//! [`classify_report`] additionally returns a [`FieldNote`] for every default
//! that was substituted, so callers can log malformed pushes without the
//! classifier itself doing any I/O.
//!
//! # Examples
//!
//! ```rust
//! use rvoip_push_core::classifier::classify;
//! use rvoip_push_core::payload::RawPushPayload;
//! use serde_json::json;
//!
//! let event = classify(&RawPushPayload::from_value(json!({
//!     "id": "x1",
//!     "nameCaller": "Bob",
//!     "handle": "+1234",
//! })));
//!
//! let call = event.as_call().unwrap();
//! assert_eq!(call.id(), "x1");
//! assert_eq!(call.name_caller(), "Bob");
//! assert_eq!(call.text_accept(), "Answer");
//!
//! let cancel = classify(&RawPushPayload::from_value(json!({
//!     "type": "cancel_call",
//!     "nameCaller": "Alice",
//! })));
//! assert!(cancel.is_cancel());
//! ```

use std::fmt;

use serde_json::{Map, Value};

use crate::call_event::{CallDefaults, CallEvent, CancelEvent, HandleType, PlatformOptions, PushEvent};
use crate::payload::{
    read_bool, read_integer, read_object, read_string, read_u32, FieldRead, RawPushPayload,
};

/// Reserved discriminator value marking a cancellation push
pub const CANCEL_CALL: &str = "cancel_call";

/// Payload key for the platform options mapping
pub const PLATFORM_OPTIONS_KEY: &str = "platformOptions";

/// Alternate key used by callkit-style senders for the same mapping
pub const PLATFORM_OPTIONS_ALIAS: &str = "ios";

const KNOWN_PLATFORM_KEYS: [&str; 5] = [
    "iconName",
    "handleType",
    "supportsVideo",
    "maximumCallGroups",
    "maximumCallsPerCallGroup",
];

/// Why a default was substituted for a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldIssue {
    Missing,
    Mistyped,
}

/// One defaulted field in a classified payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNote {
    pub field: &'static str,
    pub issue: FieldIssue,
}

impl fmt::Display for FieldNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.issue {
            FieldIssue::Missing => write!(f, "{} missing", self.field),
            FieldIssue::Mistyped => write!(f, "{} mistyped", self.field),
        }
    }
}

/// A classified payload together with the defaults it needed
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub event: PushEvent,
    pub notes: Vec<FieldNote>,
}

impl Classification {
    /// Fields that were present but unusable
    pub fn mistyped(&self) -> impl Iterator<Item = &FieldNote> {
        self.notes.iter().filter(|n| n.issue == FieldIssue::Mistyped)
    }
}

/// Classify a payload using the built-in defaults
pub fn classify(payload: &RawPushPayload) -> PushEvent {
    classify_report(payload).event
}

/// Classify a payload and report every substituted default
pub fn classify_report(payload: &RawPushPayload) -> Classification {
    classify_with(payload, &CallDefaults::default(), new_call_id)
}

/// Classify with explicit defaults and call id generator
///
/// `next_id` is only invoked when the payload carries no usable `id`.
pub fn classify_with<F>(payload: &RawPushPayload, defaults: &CallDefaults, next_id: F) -> Classification
where
    F: FnOnce() -> String,
{
    if payload.discriminator() == Some(CANCEL_CALL) {
        return Classification {
            event: PushEvent::Cancel(CancelEvent),
            notes: Vec::new(),
        };
    }

    let mut notes = Notes::default();

    let id = match read_string(payload.get("id")) {
        FieldRead::Present(id) if !id.trim().is_empty() => id,
        FieldRead::Mistyped => {
            notes.push("id", FieldIssue::Mistyped);
            next_id()
        }
        _ => {
            notes.push("id", FieldIssue::Missing);
            next_id()
        }
    };

    let name_caller = notes
        .take("nameCaller", read_string(payload.get("nameCaller")))
        .unwrap_or_else(|| defaults.name_caller.clone());
    let handle = notes
        .take("handle", read_string(payload.get("handle")))
        .unwrap_or_else(|| defaults.handle.clone());
    let call_type = notes
        .take("type", read_integer(payload.get("type")))
        .unwrap_or(defaults.call_type);
    let text_accept = notes
        .take("textAccept", read_string(payload.get("textAccept")))
        .unwrap_or_else(|| defaults.text_accept.clone());
    let text_decline = notes
        .take("textDecline", read_string(payload.get("textDecline")))
        .unwrap_or_else(|| defaults.text_decline.clone());
    let text_missed_call = notes
        .take("textMissedCall", read_string(payload.get("textMissedCall")))
        .unwrap_or_else(|| defaults.text_missed_call.clone());
    let text_callback = notes
        .take("textCallback", read_string(payload.get("textCallback")))
        .unwrap_or_else(|| defaults.text_callback.clone());
    let extra = notes
        .take("extra", read_object(payload.get("extra")))
        .unwrap_or_default();
    let platform_options = platform_options(payload, &defaults.platform_options, &mut notes);

    let call = CallEvent::new(
        id,
        name_caller,
        handle,
        call_type,
        text_accept,
        text_decline,
        text_missed_call,
        text_callback,
        extra,
        platform_options,
    );

    Classification {
        event: PushEvent::IncomingCall(call),
        notes: notes.0,
    }
}

/// Generate a fresh call identifier
pub fn new_call_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn platform_options(
    payload: &RawPushPayload,
    defaults: &PlatformOptions,
    notes: &mut Notes,
) -> PlatformOptions {
    let raw = payload
        .get(PLATFORM_OPTIONS_KEY)
        .or_else(|| payload.get(PLATFORM_OPTIONS_ALIAS));

    let map = match notes.take(PLATFORM_OPTIONS_KEY, read_object(raw)) {
        Some(map) => map,
        None => return defaults.clone(),
    };

    let icon_name = notes
        .take("platformOptions.iconName", read_string(option(&map, "iconName")))
        .unwrap_or_else(|| defaults.icon_name.clone());
    let handle_type = notes
        .take(
            "platformOptions.handleType",
            read_string(option(&map, "handleType")).and_then(|s| HandleType::parse(&s)),
        )
        .unwrap_or(defaults.handle_type);
    let supports_video = notes
        .take("platformOptions.supportsVideo", read_bool(option(&map, "supportsVideo")))
        .unwrap_or(defaults.supports_video);
    let maximum_call_groups = notes
        .take("platformOptions.maximumCallGroups", read_u32(option(&map, "maximumCallGroups")))
        .unwrap_or(defaults.maximum_call_groups);
    let maximum_calls_per_call_group = notes
        .take(
            "platformOptions.maximumCallsPerCallGroup",
            read_u32(option(&map, "maximumCallsPerCallGroup")),
        )
        .unwrap_or(defaults.maximum_calls_per_call_group);

    PlatformOptions {
        icon_name,
        handle_type,
        supports_video,
        maximum_call_groups,
        maximum_calls_per_call_group,
        additional: passthrough(&defaults.additional, map),
    }
}

/// Look up a known option, falling back to a case-folded spelling
fn option<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).or_else(|| {
        map.iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(key))
            .map(|(_, value)| value)
    })
}

fn is_known_option(key: &str) -> bool {
    KNOWN_PLATFORM_KEYS.iter().any(|known| known.eq_ignore_ascii_case(key))
}

fn passthrough(defaults: &Map<String, Value>, map: Map<String, Value>) -> Map<String, Value> {
    let mut additional = defaults.clone();
    for (key, value) in map {
        if !is_known_option(&key) {
            additional.insert(key, value);
        }
    }
    additional
}

#[derive(Default)]
struct Notes(Vec<FieldNote>);

impl Notes {
    fn push(&mut self, field: &'static str, issue: FieldIssue) {
        self.0.push(FieldNote { field, issue });
    }

    fn take<T>(&mut self, field: &'static str, read: FieldRead<T>) -> Option<T> {
        match read {
            FieldRead::Present(value) => Some(value),
            FieldRead::Missing => {
                self.push(field, FieldIssue::Missing);
                None
            }
            FieldRead::Mistyped => {
                self.push(field, FieldIssue::Mistyped);
                None
            }
        }
    }
}
