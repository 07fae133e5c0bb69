//! Signaling client.
//!
//! [`CallClient`] is a cheap-clone handle over a background pump task that
//! owns the transport. Requests are seq-paired through a pending map with a
//! timeout; service notices drive the [`DirectCall`] registry and fan out as
//! [`SdkEvent`]s to the embedding shell.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use calldock_core::prelude::*;
use calldock_core::types::{AppId, CallDirection, CallId, CallKind, EndReason, Peer, UserId};

use crate::call::DirectCall;
use crate::call_log::{CallLogPage, CallLogQuery};
use crate::protocol::Frame;
use crate::transport::SignalTransport;

/// How long a seq-paired request may wait for its response.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Commands from client handles (and call handles) to the pump task.
#[derive(Debug)]
pub enum WireCommand {
    /// Write one frame to the service.
    Write(Frame),
    /// Close the transport and stop the pump.
    Close,
}

/// Events pushed by the service, forwarded to the embedding shell.
#[derive(Debug, Clone)]
pub enum SdkEvent {
    /// An inbound call is ringing.
    Ringing(DirectCall),
    /// A call reached `Connected`.
    CallConnected(CallId),
    /// A call ended, locally visible reason attached.
    CallEnded(CallId, EndReason),
    /// The remote party toggled its media.
    RemoteMediaChanged {
        call_id: CallId,
        muted: bool,
        video: bool,
    },
    /// The signaling connection is gone; no further events will arrive.
    Disconnected { reason: String },
}

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Frame>>>>;
type CallMap = Arc<Mutex<HashMap<CallId, DirectCall>>>;

/// Client handle to the calling service.
#[derive(Clone)]
pub struct CallClient {
    app_id: AppId,
    wire_tx: mpsc::UnboundedSender<WireCommand>,
    seq: Arc<AtomicU64>,
    pending: PendingMap,
    calls: CallMap,
}

impl std::fmt::Debug for CallClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallClient")
            .field("app_id", &self.app_id)
            .finish()
    }
}

impl CallClient {
    /// Open the signaling session over an already-connected transport.
    ///
    /// Spawns the pump task and returns the client plus the event stream the
    /// shell forwards into the widget.
    pub fn connect<T>(app_id: AppId, transport: T) -> (Self, mpsc::UnboundedReceiver<SdkEvent>)
    where
        T: SignalTransport + 'static,
    {
        let (wire_tx, wire_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let calls: CallMap = Arc::new(Mutex::new(HashMap::new()));

        tokio::spawn(run_pump(
            transport,
            wire_rx,
            wire_tx.clone(),
            event_tx,
            Arc::clone(&pending),
            Arc::clone(&calls),
        ));

        (
            Self {
                app_id,
                wire_tx,
                seq: Arc::new(AtomicU64::new(1)),
                pending,
                calls,
            },
            event_rx,
        )
    }

    pub fn app_id(&self) -> &AppId {
        &self.app_id
    }

    /// Live handle for a call, if the client still tracks it.
    pub fn call(&self, call_id: &CallId) -> Option<DirectCall> {
        self.calls.lock().unwrap().get(call_id).cloned()
    }

    /// Authenticate a user. On success the returned [`Peer`] is the
    /// service's view of the authenticated identity.
    pub async fn authenticate(
        &self,
        user_id: UserId,
        access_token: Option<String>,
    ) -> Result<Peer> {
        let app_id = self.app_id.clone();
        let response = self
            .request("authenticate", |seq| Frame::AuthRequest {
                seq,
                app_id,
                user_id,
                access_token,
            })
            .await?;
        match response {
            Frame::AuthResult { user, .. } => Ok(user),
            Frame::Error { message, .. } => Err(Error::auth(message)),
            other => Err(Error::protocol(format!(
                "unexpected {} to authenticate",
                other.name()
            ))),
        }
    }

    /// Place an outbound call. The handle starts in `Dialing`.
    pub async fn dial(&self, callee: UserId, kind: CallKind) -> Result<DirectCall> {
        let call_id = CallId::new(format!(
            "c-{:08x}{:04x}",
            rand::random::<u32>(),
            rand::random::<u16>()
        ));
        let call = DirectCall::new(
            call_id.clone(),
            Peer::new(callee.as_str()),
            kind,
            CallDirection::Outbound,
            self.wire_tx.clone(),
        );
        // Registered before the request goes out so service notices racing
        // the response still find the call.
        self.calls
            .lock()
            .unwrap()
            .insert(call_id.clone(), call.clone());

        let result = self
            .request("dial", |seq| Frame::DialRequest {
                seq,
                call_id: call_id.clone(),
                callee,
                kind,
            })
            .await;
        match result {
            Ok(Frame::DialResult { .. }) => Ok(call),
            Ok(Frame::Error { message, .. }) => {
                self.calls.lock().unwrap().remove(&call_id);
                Err(Error::call(message))
            }
            Ok(other) => {
                self.calls.lock().unwrap().remove(&call_id);
                Err(Error::protocol(format!(
                    "unexpected {} to dial",
                    other.name()
                )))
            }
            Err(e) => {
                self.calls.lock().unwrap().remove(&call_id);
                Err(e)
            }
        }
    }

    /// Fetch one page of the authenticated user's call log.
    pub async fn query_call_log(&self, query: CallLogQuery) -> Result<CallLogPage> {
        let response = self
            .request("call log", |seq| Frame::LogRequest {
                seq,
                cursor: query.cursor,
                limit: query.limit,
            })
            .await?;
        match response {
            Frame::LogPage {
                records,
                next_cursor,
                ..
            } => Ok(CallLogPage {
                records,
                next_cursor,
            }),
            Frame::Error { message, .. } => Err(Error::call_log(message)),
            other => Err(Error::protocol(format!(
                "unexpected {} to log request",
                other.name()
            ))),
        }
    }

    /// End the authenticated session. The connection stays open.
    pub async fn deauthenticate(&self) -> Result<()> {
        let response = self
            .request("deauthenticate", |seq| Frame::ByeRequest { seq })
            .await?;
        match response {
            Frame::Ack { .. } => Ok(()),
            Frame::Error { message, .. } => Err(Error::auth(message)),
            other => Err(Error::protocol(format!(
                "unexpected {} to bye",
                other.name()
            ))),
        }
    }

    /// Stop the pump and fail every pending request.
    pub fn shutdown(&self) {
        let _ = self.wire_tx.send(WireCommand::Close);
        self.pending.lock().unwrap().clear();
    }

    async fn request<F>(&self, what: &str, build: F) -> Result<Frame>
    where
        F: FnOnce(u64) -> Frame,
    {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(seq, tx);

        let frame = build(seq);
        debug!("request #{seq}: {what}");
        if self.wire_tx.send(WireCommand::Write(frame)).is_err() {
            self.pending.lock().unwrap().remove(&seq);
            return Err(Error::ChannelClosed);
        }

        match tokio::time::timeout(REQUEST_TIMEOUT, rx).await {
            Ok(Ok(frame)) => Ok(frame),
            Ok(Err(_)) => Err(Error::ChannelClosed),
            Err(_) => {
                self.pending.lock().unwrap().remove(&seq);
                Err(Error::request_timeout(what))
            }
        }
    }
}

/// Background task owning the transport.
async fn run_pump<T: SignalTransport>(
    mut transport: T,
    mut wire_rx: mpsc::UnboundedReceiver<WireCommand>,
    wire_tx: mpsc::UnboundedSender<WireCommand>,
    event_tx: mpsc::UnboundedSender<SdkEvent>,
    pending: PendingMap,
    calls: CallMap,
) {
    loop {
        tokio::select! {
            cmd = wire_rx.recv() => match cmd {
                Some(WireCommand::Write(frame)) => {
                    if let Err(e) = transport.send(frame).await {
                        warn!("signaling send failed: {e}");
                        disconnect(&pending, &event_tx, e.to_string());
                        break;
                    }
                }
                Some(WireCommand::Close) | None => {
                    transport.close().await;
                    pending.lock().unwrap().clear();
                    break;
                }
            },
            frame = transport.recv() => match frame {
                Some(frame) => handle_frame(frame, &wire_tx, &event_tx, &pending, &calls),
                None => {
                    disconnect(&pending, &event_tx, "connection closed".into());
                    break;
                }
            },
        }
    }
    debug!("signaling pump exiting");
}

fn disconnect(pending: &PendingMap, event_tx: &mpsc::UnboundedSender<SdkEvent>, reason: String) {
    // Dropping the pending senders fails every in-flight request.
    pending.lock().unwrap().clear();
    let _ = event_tx.send(SdkEvent::Disconnected { reason });
}

fn handle_frame(
    frame: Frame,
    wire_tx: &mpsc::UnboundedSender<WireCommand>,
    event_tx: &mpsc::UnboundedSender<SdkEvent>,
    pending: &PendingMap,
    calls: &CallMap,
) {
    if let Some(seq) = frame.seq() {
        match pending.lock().unwrap().remove(&seq) {
            Some(tx) => {
                let _ = tx.send(frame);
            }
            None => {
                debug!("response #{seq} ({}) has no waiter, dropped", frame.name());
            }
        }
        return;
    }

    match frame {
        Frame::RingNotice {
            call_id,
            caller,
            kind,
        } => {
            let call = DirectCall::new(
                call_id.clone(),
                caller,
                kind,
                CallDirection::Inbound,
                wire_tx.clone(),
            );
            calls.lock().unwrap().insert(call_id, call.clone());
            let _ = event_tx.send(SdkEvent::Ringing(call));
        }
        Frame::AnswerNotice { call_id } => {
            if let Some(call) = calls.lock().unwrap().get(&call_id) {
                call.apply_state(calldock_core::types::CallState::Connected);
            }
            let _ = event_tx.send(SdkEvent::CallConnected(call_id));
        }
        Frame::DeclineNotice { call_id, reason } | Frame::EndNotice { call_id, reason } => {
            if let Some(call) = calls.lock().unwrap().remove(&call_id) {
                call.apply_end(reason);
            }
            let _ = event_tx.send(SdkEvent::CallEnded(call_id, reason));
        }
        Frame::MediaNotice {
            call_id,
            muted,
            video,
        } => {
            let _ = event_tx.send(SdkEvent::RemoteMediaChanged {
                call_id,
                muted,
                video,
            });
        }
        other => {
            trace!("ignoring unexpected frame {}", other.name());
        }
    }
}
