//! Message types spoken by the widget's element tree.
//!
//! One closed protocol for the whole widget family: children report upward
//! with [`UpMsg`], parents push state downward with [`DownMsg`], and anything
//! async leaves the tree as an [`Effect`] for the shell to execute. Every
//! element matches these exhaustively, so adding a variant breaks compilation
//! at each consumer that needs to care.

use std::time::Duration;

use calldock_core::tree::{NodeId, Protocol};
use calldock_core::types::{
    AppId, CallDirection, CallId, CallKind, CallRecord, CallState, EndReason, MediaDevice,
    MediaDeviceKind, Peer, UserId,
};
use calldock_rtc::DirectCall;

use crate::hooks::HookEvent;
use crate::pages::PageId;

/// Abstract input unit routed through the focus chain.
///
/// The rendering adapter owns the mapping from raw terminal (or other host)
/// input to these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Up,
    Down,
    Left,
    Right,
    Enter,
    Esc,
    Tab,
    Backspace,
    Char(char),
    /// Host-level open/close toggle for the floating widget.
    ToggleWidget,
}

/// Periodic tick identifiers, scoped per node by the timer registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerId {
    /// 1s cadence driving the in-call duration display.
    CallTicker,
    /// 2s cadence rotating the pre-connect status line.
    StatusRotator,
    /// Toast time-to-live.
    ToastTtl,
    /// Give up on an unanswered call.
    RingTimeout,
}

/// Entries of the dial page's navigation menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuEntry {
    CallLog,
    Settings,
    AppInfo,
}

impl MenuEntry {
    pub const ALL: [MenuEntry; 3] = [MenuEntry::CallLog, MenuEntry::Settings, MenuEntry::AppInfo];

    pub fn label(&self) -> &'static str {
        match self {
            MenuEntry::CallLog => "Call log",
            MenuEntry::Settings => "Settings",
            MenuEntry::AppInfo => "App info",
        }
    }

    pub fn page(&self) -> PageId {
        match self {
            MenuEntry::CallLog => PageId::CallLog,
            MenuEntry::Settings => PageId::Settings,
            MenuEntry::AppInfo => PageId::AppInfo,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Snapshots
// ─────────────────────────────────────────────────────────────────

/// The session as the elements see it.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub app_id: AppId,
    pub user: Option<Peer>,
    pub connected: bool,
}

impl SessionSnapshot {
    pub fn logged_out(app_id: AppId) -> Self {
        Self {
            app_id,
            user: None,
            connected: true,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }
}

/// One call as the elements see it.
///
/// `call_id` is `None` only for an outbound call whose dial request is still
/// in flight; the first `CallChanged` after the dial resolves fills it in.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSnapshot {
    pub call_id: Option<CallId>,
    pub peer: Peer,
    pub kind: CallKind,
    pub direction: CallDirection,
    pub state: CallState,
    pub muted: bool,
    pub video_on: bool,
    /// Connected time in whole seconds, absent before answer.
    pub duration_secs: Option<u64>,
    pub end_reason: Option<EndReason>,
}

impl CallSnapshot {
    /// Snapshot of a live SDK call handle.
    pub fn of_call(call: &DirectCall) -> Self {
        Self {
            call_id: Some(call.call_id().clone()),
            peer: call.peer().clone(),
            kind: call.kind(),
            direction: call.direction(),
            state: call.state(),
            muted: call.is_muted(),
            video_on: call.is_video_on(),
            duration_secs: call.duration().map(|d| d.as_secs()),
            end_reason: call.end_reason(),
        }
    }

    /// Placeholder for an outbound call before the dial request resolves.
    pub fn dialing(callee: &UserId, kind: CallKind) -> Self {
        Self {
            call_id: None,
            peer: Peer::new(callee.as_str()),
            kind,
            direction: CallDirection::Outbound,
            state: CallState::Dialing,
            muted: false,
            video_on: kind.is_video(),
            duration_secs: None,
            end_reason: None,
        }
    }

    /// Terminal snapshot for a call the SDK no longer tracks.
    pub fn ended(call_id: CallId, reason: EndReason) -> Self {
        Self {
            call_id: Some(call_id),
            peer: Peer::new(""),
            kind: CallKind::Voice,
            direction: CallDirection::Outbound,
            state: CallState::Ended,
            muted: false,
            video_on: false,
            duration_secs: None,
            end_reason: Some(reason),
        }
    }

    pub fn is_live(&self) -> bool {
        self.state.is_live()
    }
}

/// Device lists plus the current selection per kind.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeviceSnapshot {
    pub devices: Vec<MediaDevice>,
    pub selected: Vec<(MediaDeviceKind, String)>,
}

impl DeviceSnapshot {
    pub fn of_kind(&self, kind: MediaDeviceKind) -> impl Iterator<Item = &MediaDevice> {
        self.devices.iter().filter(move |d| d.kind == kind)
    }

    pub fn selected_id(&self, kind: MediaDeviceKind) -> Option<&str> {
        self.selected
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, id)| id.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────────────────────────

/// Child-to-parent messages.
#[derive(Debug, Clone, PartialEq)]
pub enum UpMsg {
    // ─────────────────────────────────────────────────────────
    // Page intents
    // ─────────────────────────────────────────────────────────
    /// Login form submitted.
    LoginSubmitted {
        user_id: UserId,
        access_token: Option<String>,
    },
    /// Dial form submitted.
    DialRequested { callee: UserId, kind: CallKind },
    /// User accepted an inbound ringing call.
    CallAccepted(CallId),
    /// User ended (or declined, or canceled) the call locally.
    CallEndedLocally(CallId),
    /// Menu row chosen on the dial page.
    MenuSelected(MenuEntry),
    /// Explicit navigation request.
    NavigateTo(PageId),
    /// Leave the current sub-page.
    BackRequested,
    /// Log out of the session.
    DeauthenticateRequested,
    /// Call-log scroll passed the last loaded row.
    LoadMoreRequested,
    /// Device chosen on the settings page.
    DeviceSelected { kind: MediaDeviceKind, id: String },

    // ─────────────────────────────────────────────────────────
    // Container signals
    // ─────────────────────────────────────────────────────────
    /// A ringing call arrived; the container should open itself.
    WidgetRinging,
    /// The user asked the container to close.
    WidgetCloseRequested,
    /// A toast's time-to-live expired.
    ToastExpired,
}

/// Parent-to-children messages. Cloned on fan-out.
#[derive(Debug, Clone, PartialEq)]
pub enum DownMsg {
    SessionChanged(SessionSnapshot),
    AuthFailed { message: String },
    CallChanged(CallSnapshot),
    DialFailed { message: String },
    ConnectionLost { reason: String },
    LogPageLoaded {
        records: Vec<CallRecord>,
        next_cursor: Option<String>,
    },
    LogLoadFailed { message: String },
    DevicesChanged(DeviceSnapshot),
}

/// Side effects the shell executes outside the tree.
#[derive(Debug)]
pub enum Effect {
    Authenticate {
        user_id: UserId,
        access_token: Option<String>,
    },
    Dial { callee: UserId, kind: CallKind },
    Accept(CallId),
    End(CallId),
    /// Auto-decline a second inbound call while one is live.
    DeclineBusy(CallId),
    SetMuted(CallId, bool),
    SetVideo(CallId, bool),
    FetchCallLog {
        cursor: Option<String>,
        limit: usize,
    },
    Deauthenticate,
    StartTimer {
        node: NodeId,
        timer: TimerId,
        period: Duration,
    },
    StopTimer { node: NodeId, timer: TimerId },
    /// Apply and persist a device selection, answer with `DevicesChanged`.
    SelectDevice { kind: MediaDeviceKind, id: String },
    RefreshDevices,
    EmitHook(HookEvent),
}

/// The protocol every element of the calling widget speaks.
pub struct CalldockProtocol;

impl Protocol for CalldockProtocol {
    type Up = UpMsg;
    type Down = DownMsg;
    type Effect = Effect;
    type Gesture = Gesture;
    type Timer = TimerId;
}
