//! Host-facing lifecycle hooks.
//!
//! The embedding application observes the widget through these events:
//! page changes, login outcome, widget open/close, call boundaries. Delivery
//! is fire-and-forget over an unbounded channel; a host that stops reading
//! never blocks the widget.

use tokio::sync::mpsc;

use calldock_core::types::{CallId, Peer};

use crate::pages::PageId;

/// Why the widget container opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenReason {
    /// An inbound call rang while the widget was closed.
    Ring,
    /// The user toggled it open.
    Manual,
}

/// One observable widget event.
#[derive(Debug, Clone, PartialEq)]
pub enum HookEvent {
    /// Navigation settled on a page. Always the resolved page, so a fallback
    /// reports where the user actually landed.
    PageChanged(PageId),
    LoginSucceeded(Peer),
    LoginFailed { message: String },
    LoggedOut,
    WidgetOpened { reason: OpenReason },
    WidgetClosed,
    CallStarted(CallId),
    CallEnded(CallId),
}

/// Sending half handed to the widget shell.
#[derive(Debug, Clone)]
pub struct HookSender {
    tx: mpsc::UnboundedSender<HookEvent>,
}

impl HookSender {
    /// Emit an event. Silently dropped if the host hung up.
    pub fn emit(&self, event: HookEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("hook receiver gone, event dropped");
        }
    }
}

/// Build the hook channel; the receiver goes to the host.
pub fn hook_channel() -> (HookSender, mpsc::UnboundedReceiver<HookEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (HookSender { tx }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_delivers_in_order() {
        let (hooks, mut rx) = hook_channel();
        hooks.emit(HookEvent::PageChanged(PageId::Login));
        hooks.emit(HookEvent::LoggedOut);
        assert_eq!(rx.try_recv().unwrap(), HookEvent::PageChanged(PageId::Login));
        assert_eq!(rx.try_recv().unwrap(), HookEvent::LoggedOut);
    }

    #[test]
    fn test_emit_without_receiver_does_not_panic() {
        let (hooks, rx) = hook_channel();
        drop(rx);
        hooks.emit(HookEvent::WidgetClosed);
    }
}
