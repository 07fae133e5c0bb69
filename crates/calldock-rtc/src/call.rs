//! Direct 1:1 call handles.
//!
//! A [`DirectCall`] is a cheap clone over shared state: the client's pump
//! task drives state transitions from service notices, while the widget uses
//! the same handle to accept, end, and toggle media. There is no media
//! pipeline behind the flags; they are signaling state only.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use calldock_core::prelude::*;
use calldock_core::types::{CallDirection, CallId, CallKind, CallState, EndReason, Peer};

use crate::client::WireCommand;
use crate::protocol::Frame;

struct CallInner {
    state: CallState,
    muted: bool,
    video_on: bool,
    connected_at: Option<Instant>,
    end_reason: Option<EndReason>,
}

/// Handle to one call.
#[derive(Clone)]
pub struct DirectCall {
    call_id: CallId,
    peer: Peer,
    kind: CallKind,
    direction: CallDirection,
    wire: mpsc::UnboundedSender<WireCommand>,
    inner: Arc<Mutex<CallInner>>,
}

impl std::fmt::Debug for DirectCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectCall")
            .field("call_id", &self.call_id)
            .field("peer", &self.peer.user_id)
            .field("kind", &self.kind)
            .field("direction", &self.direction)
            .field("state", &self.state())
            .finish()
    }
}

impl DirectCall {
    pub(crate) fn new(
        call_id: CallId,
        peer: Peer,
        kind: CallKind,
        direction: CallDirection,
        wire: mpsc::UnboundedSender<WireCommand>,
    ) -> Self {
        let state = match direction {
            CallDirection::Outbound => CallState::Dialing,
            CallDirection::Inbound => CallState::Ringing,
        };
        Self {
            call_id,
            peer,
            kind,
            direction,
            wire,
            inner: Arc::new(Mutex::new(CallInner {
                state,
                muted: false,
                video_on: kind.is_video(),
                connected_at: None,
                end_reason: None,
            })),
        }
    }

    pub fn call_id(&self) -> &CallId {
        &self.call_id
    }

    pub fn peer(&self) -> &Peer {
        &self.peer
    }

    pub fn kind(&self) -> CallKind {
        self.kind
    }

    pub fn direction(&self) -> CallDirection {
        self.direction
    }

    pub fn state(&self) -> CallState {
        self.inner.lock().unwrap().state
    }

    pub fn is_muted(&self) -> bool {
        self.inner.lock().unwrap().muted
    }

    pub fn is_video_on(&self) -> bool {
        self.inner.lock().unwrap().video_on
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.inner.lock().unwrap().end_reason
    }

    /// Connected time so far. `None` before the call is answered.
    pub fn duration(&self) -> Option<Duration> {
        self.inner.lock().unwrap().connected_at.map(|t| t.elapsed())
    }

    /// Accept an inbound ringing call.
    pub fn accept(&self) -> Result<()> {
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.state != CallState::Ringing {
                return Err(Error::call(format!(
                    "cannot accept a {} call",
                    inner.state
                )));
            }
            inner.state = CallState::Accepting;
        }
        self.send_frame(Frame::AnswerNotice {
            call_id: self.call_id.clone(),
        })
    }

    /// Hang up, decline, or cancel depending on the current state.
    pub fn end(&self) -> Result<()> {
        let reason = {
            let mut inner = self.inner.lock().unwrap();
            if inner.state == CallState::Ended {
                return Err(Error::call("call already ended"));
            }
            let reason = match (inner.state, self.direction) {
                (CallState::Ringing, CallDirection::Inbound) => EndReason::Declined,
                (CallState::Dialing, CallDirection::Outbound) => EndReason::Canceled,
                _ => EndReason::Completed,
            };
            inner.state = CallState::Ended;
            inner.end_reason = Some(reason);
            reason
        };
        let frame = match reason {
            EndReason::Declined => Frame::DeclineNotice {
                call_id: self.call_id.clone(),
                reason,
            },
            _ => Frame::EndNotice {
                call_id: self.call_id.clone(),
                reason,
            },
        };
        self.send_frame(frame)
    }

    /// Decline an inbound call without answering, with an explicit reason
    /// (used for the automatic busy signal).
    pub fn decline(&self, reason: EndReason) -> Result<()> {
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.state == CallState::Ended {
                return Err(Error::call("call already ended"));
            }
            inner.state = CallState::Ended;
            inner.end_reason = Some(reason);
        }
        self.send_frame(Frame::DeclineNotice {
            call_id: self.call_id.clone(),
            reason,
        })
    }

    pub fn mute_microphone(&self) -> Result<()> {
        self.set_media(Some(true), None)
    }

    pub fn unmute_microphone(&self) -> Result<()> {
        self.set_media(Some(false), None)
    }

    pub fn start_video(&self) -> Result<()> {
        self.set_media(None, Some(true))
    }

    pub fn stop_video(&self) -> Result<()> {
        self.set_media(None, Some(false))
    }

    fn set_media(&self, muted: Option<bool>, video: Option<bool>) -> Result<()> {
        let (muted, video) = {
            let mut inner = self.inner.lock().unwrap();
            if inner.state == CallState::Ended {
                return Err(Error::call("cannot change media on an ended call"));
            }
            if let Some(m) = muted {
                inner.muted = m;
            }
            if let Some(v) = video {
                inner.video_on = v;
            }
            (inner.muted, inner.video_on)
        };
        self.send_frame(Frame::MediaNotice {
            call_id: self.call_id.clone(),
            muted,
            video,
        })
    }

    fn send_frame(&self, frame: Frame) -> Result<()> {
        self.wire
            .send(WireCommand::Write(frame))
            .map_err(|_| Error::channel_send("signaling pump"))
    }

    /// Apply a service-driven state transition. Illegal transitions out of
    /// `Ended` are ignored.
    pub(crate) fn apply_state(&self, state: CallState) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state == CallState::Ended {
            return;
        }
        if state == CallState::Connected && inner.connected_at.is_none() {
            inner.connected_at = Some(Instant::now());
        }
        inner.state = state;
    }

    pub(crate) fn apply_end(&self, reason: EndReason) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state != CallState::Ended {
            inner.state = CallState::Ended;
            inner.end_reason = Some(reason);
        }
    }
}
