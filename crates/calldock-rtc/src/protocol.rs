//! Wire protocol for the calling service's signaling channel.
//!
//! Every frame is one JSON object tagged by `cmd`, fields camelCase.
//! Request frames carry a `seq` number; the service echoes it on the paired
//! response, which is how [`crate::client::CallClient`] correlates replies.
//! Notice frames (ring, answer, end, media) carry no `seq` — they are pushed
//! by the service whenever the remote side acts.

use serde::{Deserialize, Serialize};

use calldock_core::prelude::*;
use calldock_core::types::{AppId, CallId, CallKind, CallRecord, EndReason, Peer, UserId};

/// One signaling frame, in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Frame {
    // ── Requests (client → service, seq-paired) ──────────────────
    /// Authenticate a user within an application.
    AuthRequest {
        seq: u64,
        app_id: AppId,
        user_id: UserId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        access_token: Option<String>,
    },
    /// Place an outbound call. The caller picks the call id.
    DialRequest {
        seq: u64,
        call_id: CallId,
        callee: UserId,
        kind: CallKind,
    },
    /// Fetch one page of the caller's call log.
    LogRequest {
        seq: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cursor: Option<String>,
        limit: usize,
    },
    /// End the authenticated session.
    ByeRequest { seq: u64 },

    // ── Responses (service → client, seq echoes the request) ─────
    /// Successful authentication; `user` is the authenticated identity.
    AuthResult { seq: u64, user: Peer },
    /// The service accepted the dial and is ringing the callee.
    DialResult { seq: u64, call_id: CallId },
    /// One page of call records, oldest-cursor pagination.
    LogPage {
        seq: u64,
        records: Vec<CallRecord>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        next_cursor: Option<String>,
    },
    /// Generic positive acknowledgment.
    Ack { seq: u64 },
    /// Request failed; `seq` pairs it with the request.
    Error { seq: u64, code: u32, message: String },

    // ── Notices (service → client, unsolicited) ──────────────────
    /// An inbound call is ringing for the local user.
    RingNotice {
        call_id: CallId,
        caller: Peer,
        kind: CallKind,
    },
    /// The remote side (or another device) answered the call.
    AnswerNotice { call_id: CallId },
    /// The callee declined before answering.
    DeclineNotice { call_id: CallId, reason: EndReason },
    /// The call is over.
    EndNotice { call_id: CallId, reason: EndReason },
    /// The remote party toggled its media.
    MediaNotice {
        call_id: CallId,
        muted: bool,
        video: bool,
    },
}

impl Frame {
    /// The pairing number for request/response frames, `None` for notices.
    pub fn seq(&self) -> Option<u64> {
        match self {
            Frame::AuthRequest { seq, .. }
            | Frame::DialRequest { seq, .. }
            | Frame::LogRequest { seq, .. }
            | Frame::ByeRequest { seq }
            | Frame::AuthResult { seq, .. }
            | Frame::DialResult { seq, .. }
            | Frame::LogPage { seq, .. }
            | Frame::Ack { seq }
            | Frame::Error { seq, .. } => Some(*seq),
            Frame::RingNotice { .. }
            | Frame::AnswerNotice { .. }
            | Frame::DeclineNotice { .. }
            | Frame::EndNotice { .. }
            | Frame::MediaNotice { .. } => None,
        }
    }

    /// Whether this is a service-initiated notice rather than a reply.
    pub fn is_notice(&self) -> bool {
        self.seq().is_none()
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Frame::AuthRequest { .. } => "authRequest",
            Frame::DialRequest { .. } => "dialRequest",
            Frame::LogRequest { .. } => "logRequest",
            Frame::ByeRequest { .. } => "byeRequest",
            Frame::AuthResult { .. } => "authResult",
            Frame::DialResult { .. } => "dialResult",
            Frame::LogPage { .. } => "logPage",
            Frame::Ack { .. } => "ack",
            Frame::Error { .. } => "error",
            Frame::RingNotice { .. } => "ringNotice",
            Frame::AnswerNotice { .. } => "answerNotice",
            Frame::DeclineNotice { .. } => "declineNotice",
            Frame::EndNotice { .. } => "endNotice",
            Frame::MediaNotice { .. } => "mediaNotice",
        }
    }
}

/// Serialize a frame to its wire form.
pub fn encode_frame(frame: &Frame) -> Result<String> {
    Ok(serde_json::to_string(frame)?)
}

/// Parse one wire frame. Unknown `cmd` tags and malformed JSON both come
/// back as [`Error::Protocol`].
pub fn parse_frame(text: &str) -> Result<Frame> {
    serde_json::from_str(text).map_err(|e| {
        // Truncate by characters, not bytes: the service controls this text.
        let head: String = text.chars().take(120).collect();
        Error::protocol(format!("bad frame: {e}: {head}"))
    })
}
