//! Signaling transports.
//!
//! [`SignalTransport`] is the seam between [`crate::client::CallClient`] and
//! the wire. Production uses [`WsTransport`] (WebSocket against the calling
//! service); tests and the demo mode use [`LoopbackSwitch`], an in-process
//! switchboard that behaves like a miniature signaling service and routes
//! frames between locally registered users.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::Utc;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use calldock_core::prelude::*;
use calldock_core::types::{
    AppId, CallDirection, CallId, CallKind, CallRecord, EndReason, Peer, UserId,
};

use crate::protocol::{encode_frame, parse_frame, Frame};

/// A bidirectional frame pipe to the signaling service.
///
/// `recv` returning `None` means the connection is gone for good; the client
/// reports it as a disconnect and stops pumping.
#[trait_variant::make(SignalTransport: Send)]
pub trait LocalSignalTransport {
    /// Write one frame to the service.
    async fn send(&mut self, frame: Frame) -> Result<()>;
    /// Next frame from the service, `None` once the connection is closed.
    async fn recv(&mut self) -> Option<Frame>;
    /// Close the connection. Idempotent.
    async fn close(&mut self);
}

// ─────────────────────────────────────────────────────────────────
// WebSocket transport
// ─────────────────────────────────────────────────────────────────

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Characters escaped in query values beyond the control set.
const QUERY_ESCAPES: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'&')
    .add(b'+')
    .add(b'=')
    .add(b'?');

/// Assemble the signaling endpoint URL with identity in the query string.
pub fn build_endpoint_url(endpoint: &str, app_id: &AppId, user_id: &UserId) -> Result<String> {
    let base = Url::parse(endpoint)
        .map_err(|e| Error::transport(format!("bad endpoint {endpoint}: {e}")))?;
    let query = format!(
        "appId={}&userId={}",
        utf8_percent_encode(app_id.as_str(), QUERY_ESCAPES),
        utf8_percent_encode(user_id.as_str(), QUERY_ESCAPES),
    );
    let mut url = base;
    url.set_query(Some(&query));
    Ok(url.to_string())
}

/// WebSocket transport over `tokio-tungstenite`.
pub struct WsTransport {
    sink: SplitSink<WsStream, WsMessage>,
    stream: SplitStream<WsStream>,
    closed: bool,
}

impl WsTransport {
    /// Connect to the signaling service.
    pub async fn connect(endpoint: &str, app_id: &AppId, user_id: &UserId) -> Result<Self> {
        let url = build_endpoint_url(endpoint, app_id, user_id)?;
        info!("connecting to signaling service at {url}");
        let (ws, _response) = connect_async(&url)
            .await
            .map_err(|e| Error::transport(format!("connect {url}: {e}")))?;
        let (sink, stream) = ws.split();
        Ok(Self {
            sink,
            stream,
            closed: false,
        })
    }
}

impl SignalTransport for WsTransport {
    async fn send(&mut self, frame: Frame) -> Result<()> {
        let json = encode_frame(&frame)?;
        self.sink
            .send(WsMessage::Text(json.into()))
            .await
            .map_err(|e| Error::transport(format!("send {}: {e}", frame.name())))
    }

    async fn recv(&mut self) -> Option<Frame> {
        loop {
            match self.stream.next().await? {
                Ok(WsMessage::Text(text)) => match parse_frame(text.as_str()) {
                    Ok(frame) => return Some(frame),
                    Err(e) => {
                        warn!("dropping unparseable frame: {e}");
                    }
                },
                Ok(WsMessage::Ping(payload)) => {
                    let _ = self.sink.send(WsMessage::Pong(payload)).await;
                }
                Ok(WsMessage::Close(_)) => {
                    debug!("signaling service sent close");
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("websocket read error: {e}");
                    return None;
                }
            }
        }
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            let _ = self.sink.send(WsMessage::Close(None)).await;
            let _ = self.sink.close().await;
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Loopback switchboard
// ─────────────────────────────────────────────────────────────────

struct LoopbackLine {
    peer: Peer,
    tx: mpsc::UnboundedSender<Frame>,
    authed: bool,
}

struct ActiveCall {
    caller: UserId,
    callee: UserId,
    kind: CallKind,
    started_at: chrono::DateTime<Utc>,
    connected_at: Option<Instant>,
}

impl ActiveCall {
    fn other_side(&self, user: &UserId) -> UserId {
        if &self.caller == user {
            self.callee.clone()
        } else {
            self.caller.clone()
        }
    }
}

#[derive(Default)]
struct SwitchState {
    lines: HashMap<UserId, LoopbackLine>,
    tokens: HashMap<UserId, String>,
    active: HashMap<CallId, ActiveCall>,
    logs: HashMap<UserId, Vec<CallRecord>>,
}

/// In-process signaling service.
///
/// Registered users get a [`LoopbackTransport`]; every frame a transport
/// sends is handled here synchronously, with responses and notices pushed
/// straight into the recipients' receive queues. Finished calls are appended
/// to a per-user log store so call-log pagination works against it too.
#[derive(Clone, Default)]
pub struct LoopbackSwitch {
    inner: Arc<Mutex<SwitchState>>,
}

impl LoopbackSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a local user and hand back its transport.
    pub fn register(&self, peer: Peer) -> LoopbackTransport {
        let (tx, rx) = mpsc::unbounded_channel();
        let user_id = peer.user_id.clone();
        let mut state = self.inner.lock().unwrap();
        state.lines.insert(
            user_id.clone(),
            LoopbackLine {
                peer,
                tx,
                authed: false,
            },
        );
        LoopbackTransport {
            user_id,
            switch: self.clone(),
            rx,
            closed: false,
        }
    }

    /// Require `token` on authentication for `user`.
    pub fn set_access_token(&self, user: &UserId, token: impl Into<String>) {
        self.inner
            .lock()
            .unwrap()
            .tokens
            .insert(user.clone(), token.into());
    }

    /// Pre-populate a user's call log, newest last.
    pub fn seed_log(&self, user: &UserId, records: Vec<CallRecord>) {
        self.inner
            .lock()
            .unwrap()
            .logs
            .entry(user.clone())
            .or_default()
            .extend(records);
    }

    pub fn is_registered(&self, user: &UserId) -> bool {
        self.inner.lock().unwrap().lines.contains_key(user)
    }

    fn unregister(&self, user: &UserId) {
        self.inner.lock().unwrap().lines.remove(user);
    }

    fn process(&self, from: &UserId, frame: Frame) {
        let mut state = self.inner.lock().unwrap();
        match frame {
            Frame::AuthRequest {
                seq, access_token, ..
            } => {
                let expected = state.tokens.get(from).cloned();
                let ok = match expected {
                    Some(token) => access_token.as_deref() == Some(token.as_str()),
                    None => true,
                };
                if !ok {
                    push(&state, from, Frame::Error {
                        seq,
                        code: 401,
                        message: "invalid access token".into(),
                    });
                    return;
                }
                let peer = match state.lines.get_mut(from) {
                    Some(line) => {
                        line.authed = true;
                        line.peer.clone()
                    }
                    None => return,
                };
                push(&state, from, Frame::AuthResult { seq, user: peer });
            }
            Frame::DialRequest {
                seq,
                call_id,
                callee,
                kind,
            } => {
                let caller_peer = match state.lines.get(from) {
                    Some(line) => line.peer.clone(),
                    None => return,
                };
                if !state.lines.contains_key(&callee) {
                    push(&state, from, Frame::Error {
                        seq,
                        code: 404,
                        message: format!("callee {callee} is not reachable"),
                    });
                    return;
                }
                state.active.insert(
                    call_id.clone(),
                    ActiveCall {
                        caller: from.clone(),
                        callee: callee.clone(),
                        kind,
                        started_at: Utc::now(),
                        connected_at: None,
                    },
                );
                push(&state, &callee, Frame::RingNotice {
                    call_id: call_id.clone(),
                    caller: caller_peer,
                    kind,
                });
                push(&state, from, Frame::DialResult { seq, call_id });
            }
            Frame::AnswerNotice { call_id } => {
                let (caller, callee) = match state.active.get_mut(&call_id) {
                    Some(call) => {
                        call.connected_at = Some(Instant::now());
                        (call.caller.clone(), call.callee.clone())
                    }
                    None => {
                        trace!("answer for unknown call {call_id} ignored");
                        return;
                    }
                };
                // Both sides learn the call is connected.
                push(&state, &caller, Frame::AnswerNotice {
                    call_id: call_id.clone(),
                });
                push(&state, &callee, Frame::AnswerNotice { call_id });
            }
            Frame::DeclineNotice { call_id, reason } => {
                if let Some(call) = state.active.remove(&call_id) {
                    let other = call.other_side(from);
                    finish_call(&mut state, &call_id, &call, reason);
                    push(&state, &other, Frame::DeclineNotice { call_id, reason });
                }
            }
            Frame::EndNotice { call_id, reason } => {
                if let Some(call) = state.active.remove(&call_id) {
                    let other = call.other_side(from);
                    finish_call(&mut state, &call_id, &call, reason);
                    push(&state, &other, Frame::EndNotice { call_id, reason });
                }
            }
            Frame::MediaNotice {
                call_id,
                muted,
                video,
            } => {
                if let Some(call) = state.active.get(&call_id) {
                    let other = call.other_side(from);
                    push(&state, &other, Frame::MediaNotice {
                        call_id,
                        muted,
                        video,
                    });
                }
            }
            Frame::LogRequest { seq, cursor, limit } => {
                let records = state.logs.get(from).cloned().unwrap_or_default();
                // Served newest first; the cursor is an offset into that order.
                let offset: usize = cursor.and_then(|c| c.parse().ok()).unwrap_or(0);
                let newest_first: Vec<CallRecord> = records.into_iter().rev().collect();
                let end = (offset + limit).min(newest_first.len());
                let page = newest_first
                    .get(offset..end)
                    .map(<[CallRecord]>::to_vec)
                    .unwrap_or_default();
                let next_cursor = (end < newest_first.len()).then(|| end.to_string());
                push(&state, from, Frame::LogPage {
                    seq,
                    records: page,
                    next_cursor,
                });
            }
            Frame::ByeRequest { seq } => {
                if let Some(line) = state.lines.get_mut(from) {
                    line.authed = false;
                }
                push(&state, from, Frame::Ack { seq });
            }
            other => {
                trace!("switch ignoring client frame {}", other.name());
            }
        }
    }
}

fn push(state: &SwitchState, to: &UserId, frame: Frame) {
    if let Some(line) = state.lines.get(to) {
        let _ = line.tx.send(frame);
    }
}

/// Record a finished call in both parties' logs.
fn finish_call(state: &mut SwitchState, call_id: &CallId, call: &ActiveCall, reason: EndReason) {
    let duration_secs = call
        .connected_at
        .map(|t| t.elapsed().as_secs())
        .unwrap_or(0);
    let caller_peer = state.lines.get(&call.caller).map(|l| l.peer.clone());
    let callee_peer = state.lines.get(&call.callee).map(|l| l.peer.clone());
    let legs = [
        (&call.caller, CallDirection::Outbound, callee_peer),
        (&call.callee, CallDirection::Inbound, caller_peer),
    ];
    for (user, direction, peer) in legs {
        let Some(peer) = peer else { continue };
        state.logs.entry(user.clone()).or_default().push(CallRecord {
            call_id: call_id.clone(),
            kind: call.kind,
            direction,
            peer,
            started_at: call.started_at,
            duration_secs,
            end_reason: reason,
        });
    }
}

/// One user's end of a [`LoopbackSwitch`].
pub struct LoopbackTransport {
    user_id: UserId,
    switch: LoopbackSwitch,
    rx: mpsc::UnboundedReceiver<Frame>,
    closed: bool,
}

impl SignalTransport for LoopbackTransport {
    async fn send(&mut self, frame: Frame) -> Result<()> {
        if self.closed {
            return Err(Error::transport("loopback transport closed"));
        }
        self.switch.process(&self.user_id, frame);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Frame> {
        if self.closed {
            return None;
        }
        self.rx.recv().await
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.switch.unregister(&self.user_id);
            self.rx.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> CallRecord {
        CallRecord {
            call_id: CallId::new(id),
            kind: CallKind::Voice,
            direction: CallDirection::Outbound,
            peer: Peer::new("bob"),
            started_at: Utc::now(),
            duration_secs: 5,
            end_reason: EndReason::Completed,
        }
    }

    // Qualified wrappers: with both the trait and its generated Send variant
    // in scope, unqualified method calls on the transport are ambiguous.
    async fn send(t: &mut LoopbackTransport, frame: Frame) -> Result<()> {
        SignalTransport::send(t, frame).await
    }

    async fn recv(t: &mut LoopbackTransport) -> Option<Frame> {
        SignalTransport::recv(t).await
    }

    async fn close(t: &mut LoopbackTransport) {
        SignalTransport::close(t).await;
    }

    #[test]
    fn test_endpoint_url_assembly() {
        let url = build_endpoint_url(
            "wss://signal.example.com/v1",
            &AppId::new("app 1"),
            &UserId::new("alice&co"),
        )
        .unwrap();
        assert_eq!(
            url,
            "wss://signal.example.com/v1?appId=app%201&userId=alice%26co"
        );
    }

    #[test]
    fn test_endpoint_url_rejects_garbage() {
        assert!(build_endpoint_url("not a url", &AppId::new("a"), &UserId::new("u")).is_err());
    }

    #[tokio::test]
    async fn test_loopback_auth_round_trip() {
        let switch = LoopbackSwitch::new();
        let mut alice = switch.register(Peer::new("alice").with_nickname("Alice"));

        send(
            &mut alice,
            Frame::AuthRequest {
                seq: 1,
                app_id: AppId::new("app"),
                user_id: UserId::new("alice"),
                access_token: None,
            },
        )
        .await
        .unwrap();

        match recv(&mut alice).await.unwrap() {
            Frame::AuthResult { seq, user } => {
                assert_eq!(seq, 1);
                assert_eq!(user.display_name(), "Alice");
            }
            other => panic!("expected AuthResult, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_loopback_rejects_bad_token() {
        let switch = LoopbackSwitch::new();
        let alice_id = UserId::new("alice");
        switch.set_access_token(&alice_id, "s3cret");
        let mut alice = switch.register(Peer::new("alice"));

        send(
            &mut alice,
            Frame::AuthRequest {
                seq: 7,
                app_id: AppId::new("app"),
                user_id: alice_id,
                access_token: Some("wrong".into()),
            },
        )
        .await
        .unwrap();

        match recv(&mut alice).await.unwrap() {
            Frame::Error { seq, code, .. } => {
                assert_eq!(seq, 7);
                assert_eq!(code, 401);
            }
            other => panic!("expected Error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_loopback_dial_rings_callee() {
        let switch = LoopbackSwitch::new();
        let mut alice = switch.register(Peer::new("alice"));
        let mut bob = switch.register(Peer::new("bob"));

        send(
            &mut alice,
            Frame::DialRequest {
                seq: 2,
                call_id: CallId::new("c1"),
                callee: UserId::new("bob"),
                kind: CallKind::Video,
            },
        )
        .await
        .unwrap();

        assert!(matches!(
            recv(&mut alice).await.unwrap(),
            Frame::DialResult { seq: 2, .. }
        ));
        match recv(&mut bob).await.unwrap() {
            Frame::RingNotice { caller, kind, .. } => {
                assert_eq!(caller.user_id.as_str(), "alice");
                assert_eq!(kind, CallKind::Video);
            }
            other => panic!("expected RingNotice, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_loopback_unknown_callee_errors() {
        let switch = LoopbackSwitch::new();
        let mut alice = switch.register(Peer::new("alice"));

        send(
            &mut alice,
            Frame::DialRequest {
                seq: 3,
                call_id: CallId::new("c1"),
                callee: UserId::new("nobody"),
                kind: CallKind::Voice,
            },
        )
        .await
        .unwrap();

        assert!(matches!(
            recv(&mut alice).await.unwrap(),
            Frame::Error { seq: 3, code: 404, .. }
        ));
    }

    #[tokio::test]
    async fn test_loopback_end_writes_both_logs() {
        let switch = LoopbackSwitch::new();
        let mut alice = switch.register(Peer::new("alice"));
        let mut bob = switch.register(Peer::new("bob"));

        send(
            &mut alice,
            Frame::DialRequest {
                seq: 1,
                call_id: CallId::new("c1"),
                callee: UserId::new("bob"),
                kind: CallKind::Voice,
            },
        )
        .await
        .unwrap();
        send(
            &mut bob,
            Frame::AnswerNotice {
                call_id: CallId::new("c1"),
            },
        )
        .await
        .unwrap();
        send(
            &mut alice,
            Frame::EndNotice {
                call_id: CallId::new("c1"),
                reason: EndReason::Completed,
            },
        )
        .await
        .unwrap();

        // Bob hears the hang-up.
        let mut saw_end = false;
        while let Ok(frame) = bob.rx.try_recv() {
            if matches!(frame, Frame::EndNotice { .. }) {
                saw_end = true;
            }
        }
        assert!(saw_end);

        let state = switch.inner.lock().unwrap();
        for (user, direction) in [
            (UserId::new("alice"), CallDirection::Outbound),
            (UserId::new("bob"), CallDirection::Inbound),
        ] {
            let log = state.logs.get(&user).expect("log entry");
            assert_eq!(log.len(), 1);
            assert_eq!(log[0].direction, direction);
            assert_eq!(log[0].end_reason, EndReason::Completed);
        }
    }

    #[tokio::test]
    async fn test_loopback_log_pagination() {
        let switch = LoopbackSwitch::new();
        let alice_id = UserId::new("alice");
        switch.seed_log(&alice_id, (0..7).map(|i| record(&format!("c{i}"))).collect());
        let mut alice = switch.register(Peer::new("alice"));

        send(
            &mut alice,
            Frame::LogRequest {
                seq: 1,
                cursor: None,
                limit: 3,
            },
        )
        .await
        .unwrap();
        let (first, cursor) = match recv(&mut alice).await.unwrap() {
            Frame::LogPage {
                records,
                next_cursor,
                ..
            } => (records, next_cursor),
            other => panic!("expected LogPage, got {other:?}"),
        };
        assert_eq!(first.len(), 3);
        // Newest first.
        assert_eq!(first[0].call_id.as_str(), "c6");
        let cursor = cursor.expect("more pages");

        send(
            &mut alice,
            Frame::LogRequest {
                seq: 2,
                cursor: Some(cursor),
                limit: 10,
            },
        )
        .await
        .unwrap();
        match recv(&mut alice).await.unwrap() {
            Frame::LogPage {
                records,
                next_cursor,
                ..
            } => {
                assert_eq!(records.len(), 4);
                assert!(next_cursor.is_none());
            }
            other => panic!("expected LogPage, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_closed_transport_refuses_send() {
        let switch = LoopbackSwitch::new();
        let mut alice = switch.register(Peer::new("alice"));
        close(&mut alice).await;
        assert!(send(&mut alice, Frame::ByeRequest { seq: 1 }).await.is_err());
        assert!(recv(&mut alice).await.is_none());
        assert!(!switch.is_registered(&UserId::new("alice")));
    }
}
