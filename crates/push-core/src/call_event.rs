//! Normalized call events
//!
//! A classified push becomes a [`PushEvent`]: either a [`CancelEvent`] or a
//! fully populated [`CallEvent`]. The call record serializes with the
//! camelCase argument names a callkit-style presenter expects.
//!
//! # Examples
//!
//! ```rust
//! use rvoip_push_core::call_event::{CallDefaults, HandleType};
//!
//! let defaults = CallDefaults::default();
//! assert_eq!(defaults.name_caller, "Unknown");
//! assert_eq!(defaults.platform_options.handle_type, HandleType::Generic);
//! assert_eq!(defaults.platform_options.maximum_call_groups, 2);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// Call type value for an audio-only call
pub const CALL_TYPE_AUDIO: i64 = 0;
/// Call type value for a video call
pub const CALL_TYPE_VIDEO: i64 = 1;

/// How the native call UI should interpret a call handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleType {
    #[default]
    Generic,
    Number,
    Email,
}

impl HandleType {
    /// Parse a handle type, ignoring case
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "generic" => Some(HandleType::Generic),
            "number" => Some(HandleType::Number),
            "email" => Some(HandleType::Email),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HandleType::Generic => "generic",
            HandleType::Number => "number",
            HandleType::Email => "email",
        }
    }
}

impl fmt::Display for HandleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Platform-specific presentation options for the native call UI
///
/// Sub-keys the normalizer does not model are kept in `additional` and
/// serialized back alongside the known ones. The lowercase aliases accept
/// keys from configuration sources that fold case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlatformOptions {
    /// Name of the icon asset shown in the call UI
    #[serde(alias = "iconname")]
    pub icon_name: String,
    /// How the caller handle should be interpreted
    #[serde(alias = "handletype")]
    pub handle_type: HandleType,
    /// Whether the call UI offers video
    #[serde(alias = "supportsvideo")]
    pub supports_video: bool,
    /// Maximum number of concurrent call groups
    #[serde(alias = "maximumcallgroups")]
    pub maximum_call_groups: u32,
    /// Maximum number of calls in one group
    #[serde(alias = "maximumcallspercallgroup")]
    pub maximum_calls_per_call_group: u32,
    /// Unmodeled options passed through untouched
    #[serde(flatten)]
    pub additional: Map<String, Value>,
}

impl Default for PlatformOptions {
    fn default() -> Self {
        Self {
            icon_name: "CallKitIcon".to_string(),
            handle_type: HandleType::Generic,
            supports_video: true,
            maximum_call_groups: 2,
            maximum_calls_per_call_group: 1,
            additional: Map::new(),
        }
    }
}

/// The fixed fallbacks used when a push omits a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallDefaults {
    pub name_caller: String,
    pub handle: String,
    pub call_type: i64,
    pub text_accept: String,
    pub text_decline: String,
    pub text_missed_call: String,
    pub text_callback: String,
    pub platform_options: PlatformOptions,
}

impl Default for CallDefaults {
    fn default() -> Self {
        Self {
            name_caller: "Unknown".to_string(),
            handle: "Caller".to_string(),
            call_type: CALL_TYPE_AUDIO,
            text_accept: "Answer".to_string(),
            text_decline: "Decline".to_string(),
            text_missed_call: "Missed call".to_string(),
            text_callback: "Call back".to_string(),
            platform_options: PlatformOptions::default(),
        }
    }
}

/// A normalized incoming-call announcement
///
/// Every field is populated; the classifier is the only producer, and the
/// record is read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallEvent {
    id: String,
    name_caller: String,
    handle: String,
    #[serde(rename = "type")]
    call_type: i64,
    text_accept: String,
    text_decline: String,
    text_missed_call: String,
    text_callback: String,
    extra: Map<String, Value>,
    platform_options: PlatformOptions,
}

impl CallEvent {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: String,
        name_caller: String,
        handle: String,
        call_type: i64,
        text_accept: String,
        text_decline: String,
        text_missed_call: String,
        text_callback: String,
        extra: Map<String, Value>,
        platform_options: PlatformOptions,
    ) -> Self {
        Self {
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
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name_caller(&self) -> &str {
        &self.name_caller
    }

    pub fn handle(&self) -> &str {
        &self.handle
    }

    pub fn call_type(&self) -> i64 {
        self.call_type
    }

    pub fn is_video(&self) -> bool {
        self.call_type == CALL_TYPE_VIDEO
    }

    pub fn text_accept(&self) -> &str {
        &self.text_accept
    }

    pub fn text_decline(&self) -> &str {
        &self.text_decline
    }

    pub fn text_missed_call(&self) -> &str {
        &self.text_missed_call
    }

    pub fn text_callback(&self) -> &str {
        &self.text_callback
    }

    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    pub fn platform_options(&self) -> &PlatformOptions {
        &self.platform_options
    }

    /// Render the record as the argument map handed to the call UI
    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Request to tear down every active call
///
/// The push carries no call identifier, so cancellation is not correlated to
/// a specific call: receiving one ends *all* active calls. That is only
/// correct while a single call at a time is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CancelEvent;

/// Result of classifying a push payload
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// The payload announced a call cancellation
    Cancel(CancelEvent),
    /// The payload announced a new incoming call
    IncomingCall(CallEvent),
}

impl PushEvent {
    pub fn is_cancel(&self) -> bool {
        matches!(self, PushEvent::Cancel(_))
    }

    /// The call record, for incoming calls
    pub fn as_call(&self) -> Option<&CallEvent> {
        match self {
            PushEvent::IncomingCall(call) => Some(call),
            PushEvent::Cancel(_) => None,
        }
    }

    pub fn into_call(self) -> Option<CallEvent> {
        match self {
            PushEvent::IncomingCall(call) => Some(call),
            PushEvent::Cancel(_) => None,
        }
    }

    /// Short label used in logs
    pub fn label(&self) -> &'static str {
        match self {
            PushEvent::Cancel(_) => "cancel",
            PushEvent::IncomingCall(_) => "incoming_call",
        }
    }
}
