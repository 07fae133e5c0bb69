//! # Calling Domain Types
//!
//! Shared vocabulary between the signaling client (`calldock-rtc`), the
//! widget elements (`calldock-app`), and the rendering adapter
//! (`calldock-tui`): identifiers, call lifecycle states, peers, call-log
//! records, and media devices.
//!
//! Wire-facing structs serialize as camelCase to match the signaling
//! service's JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ── Identifiers ──────────────────────────────────────────────────────────────

/// Application identifier issued by the calling service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppId(String);

impl AppId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AppId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// User identifier within an application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Unique identifier of a single call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(String);

impl CallId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CallId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

// ── Call Lifecycle ───────────────────────────────────────────────────────────

/// Which side initiated the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallDirection {
    Outbound,
    Inbound,
}

impl fmt::Display for CallDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallDirection::Outbound => write!(f, "outbound"),
            CallDirection::Inbound => write!(f, "inbound"),
        }
    }
}

/// Voice-only or video call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    #[default]
    Voice,
    Video,
}

impl CallKind {
    pub fn is_video(&self) -> bool {
        matches!(self, CallKind::Video)
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallKind::Voice => write!(f, "voice"),
            CallKind::Video => write!(f, "video"),
        }
    }
}

/// Lifecycle state of a call.
///
/// Outbound calls move `Dialing → Connected`; inbound calls move
/// `Ringing → Accepting → Connected`. Either side may jump to `Ended`
/// from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallState {
    /// Outbound call waiting for the callee to pick up.
    Dialing,
    /// Inbound call waiting for the local user to accept.
    Ringing,
    /// Local user accepted; waiting for the media path to settle.
    Accepting,
    /// Both sides joined.
    Connected,
    /// Connection dropped; the service is trying to re-establish it.
    Reconnecting,
    /// Terminal state.
    Ended,
}

impl CallState {
    /// Whether the call still occupies the session (anything but `Ended`).
    pub fn is_live(&self) -> bool {
        !matches!(self, CallState::Ended)
    }

    /// Whether both sides have joined at least once.
    pub fn is_answered(&self) -> bool {
        matches!(self, CallState::Connected | CallState::Reconnecting)
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallState::Dialing => write!(f, "dialing"),
            CallState::Ringing => write!(f, "ringing"),
            CallState::Accepting => write!(f, "accepting"),
            CallState::Connected => write!(f, "connected"),
            CallState::Reconnecting => write!(f, "reconnecting"),
            CallState::Ended => write!(f, "ended"),
        }
    }
}

/// Why a call reached `Ended`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EndReason {
    /// Normal hang-up after a connected call.
    Completed,
    /// Callee rejected the call.
    Declined,
    /// Caller gave up before the callee answered.
    Canceled,
    /// Ring timed out without an answer.
    NoAnswer,
    /// Callee was already in another call.
    Busy,
    /// Answered on another device of the same user.
    OtherDevice,
    /// Transport or service failure.
    Error,
}

impl EndReason {
    /// Whether the callee never joined (rendered as "missed" on their side).
    pub fn is_missed(&self) -> bool {
        matches!(self, EndReason::Canceled | EndReason::NoAnswer)
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndReason::Completed => write!(f, "completed"),
            EndReason::Declined => write!(f, "declined"),
            EndReason::Canceled => write!(f, "canceled"),
            EndReason::NoAnswer => write!(f, "no answer"),
            EndReason::Busy => write!(f, "busy"),
            EndReason::OtherDevice => write!(f, "other device"),
            EndReason::Error => write!(f, "error"),
        }
    }
}

// ── Peers ────────────────────────────────────────────────────────────────────

/// The remote party of a call as known to the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Peer {
    pub user_id: UserId,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub profile_url: Option<String>,
}

impl Peer {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: UserId::new(user_id),
            nickname: None,
            profile_url: None,
        }
    }

    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }

    /// Nickname when set, user id otherwise.
    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(self.user_id.as_str())
    }
}

// ── Call Log ─────────────────────────────────────────────────────────────────

/// One finished call as reported by the call-log service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    pub call_id: CallId,
    pub kind: CallKind,
    pub direction: CallDirection,
    pub peer: Peer,
    pub started_at: DateTime<Utc>,
    /// Connected time in whole seconds. Zero for unanswered calls.
    pub duration_secs: u64,
    pub end_reason: EndReason,
}

impl CallRecord {
    /// Whether this entry renders as a missed inbound call.
    pub fn is_missed_inbound(&self) -> bool {
        self.direction == CallDirection::Inbound && self.end_reason.is_missed()
    }
}

// ── Media Devices ────────────────────────────────────────────────────────────

/// Category of a media device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaDeviceKind {
    AudioInput,
    AudioOutput,
    VideoInput,
}

impl MediaDeviceKind {
    pub const ALL: [MediaDeviceKind; 3] = [
        MediaDeviceKind::AudioInput,
        MediaDeviceKind::AudioOutput,
        MediaDeviceKind::VideoInput,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MediaDeviceKind::AudioInput => "Microphone",
            MediaDeviceKind::AudioOutput => "Speaker",
            MediaDeviceKind::VideoInput => "Camera",
        }
    }
}

/// A selectable audio or video device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaDevice {
    pub id: String,
    pub label: String,
    pub kind: MediaDeviceKind,
}

impl MediaDevice {
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: MediaDeviceKind) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind,
        }
    }
}

// ── Formatting Helpers ───────────────────────────────────────────────────────

/// Format a duration in seconds as `mm:ss`, rolling into `h:mm:ss` past an
/// hour.
pub fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}
