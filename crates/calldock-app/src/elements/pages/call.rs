//! In-call screen.

use std::any::Any;
use std::time::Duration;

use calldock_core::surface::Surface;
use calldock_core::tree::{Ctx, Element, NodeId, Tree};
use calldock_core::types::{format_duration, CallDirection, CallState};

use crate::elements::widgets::call_controls;
use crate::message::{CalldockProtocol, CallSnapshot, DownMsg, Effect, Gesture, TimerId, UpMsg};

/// Status lines rotated while waiting for the remote side.
const STATUS_LINES: [&str; 4] = ["Calling…", "Ringing…", "Waiting to connect…", "Still trying…"];

const TICK_PERIOD: Duration = Duration::from_secs(1);
const ROTATE_PERIOD: Duration = Duration::from_secs(2);
const RING_TIMEOUT: Duration = Duration::from_secs(30);

/// Renders one call from explicit props; the session machine attaches and
/// removes it around the call's lifetime.
pub struct CallView {
    snap: CallSnapshot,
    status_index: usize,
    elapsed_secs: u64,
}

impl CallView {
    pub fn new(snap: CallSnapshot) -> Self {
        Self {
            snap,
            status_index: rand::random::<usize>() % STATUS_LINES.len(),
            elapsed_secs: 0,
        }
    }

    pub fn snapshot(&self) -> &CallSnapshot {
        &self.snap
    }

    pub fn is_live(&self) -> bool {
        self.snap.is_live()
    }

    fn apply(&mut self, ctx: &mut Ctx<'_, CalldockProtocol>, update: CallSnapshot) {
        let mine = match (&self.snap.call_id, &update.call_id) {
            // First update after an outbound dial resolves adopts the id.
            (None, Some(_)) => update.direction == CallDirection::Outbound,
            (Some(ours), Some(theirs)) => ours == theirs,
            _ => false,
        };
        if !mine {
            return;
        }

        let was_answered = self.snap.state.is_answered();
        let keep_peer = update.peer.user_id.as_str().is_empty();
        let old_peer = self.snap.peer.clone();
        self.snap = update;
        if keep_peer {
            self.snap.peer = old_peer;
        }
        if let Some(secs) = self.snap.duration_secs {
            self.elapsed_secs = secs;
        }
        if !was_answered && self.snap.state.is_answered() {
            ctx.effect(Effect::StopTimer {
                node: ctx.me(),
                timer: TimerId::StatusRotator,
            });
            ctx.effect(Effect::StopTimer {
                node: ctx.me(),
                timer: TimerId::RingTimeout,
            });
        }
    }
}

impl Element<CalldockProtocol> for CallView {
    fn kind(&self) -> &'static str {
        "call"
    }

    fn on_attached(&mut self, ctx: &mut Ctx<'_, CalldockProtocol>) {
        let node = ctx.me();
        ctx.effect(Effect::StartTimer {
            node,
            timer: TimerId::CallTicker,
            period: TICK_PERIOD,
        });
        ctx.effect(Effect::StartTimer {
            node,
            timer: TimerId::StatusRotator,
            period: ROTATE_PERIOD,
        });
        ctx.effect(Effect::StartTimer {
            node,
            timer: TimerId::RingTimeout,
            period: RING_TIMEOUT,
        });
    }

    fn on_removed(&mut self, ctx: &mut Ctx<'_, CalldockProtocol>) {
        let node = ctx.me();
        for timer in [
            TimerId::CallTicker,
            TimerId::StatusRotator,
            TimerId::RingTimeout,
        ] {
            ctx.effect(Effect::StopTimer { node, timer });
        }
    }

    fn recv_down(&mut self, ctx: &mut Ctx<'_, CalldockProtocol>, msg: DownMsg) {
        match msg {
            DownMsg::CallChanged(update) => self.apply(ctx, update),
            _ => {}
        }
    }

    fn on_timer(&mut self, ctx: &mut Ctx<'_, CalldockProtocol>, timer: TimerId) {
        match timer {
            TimerId::CallTicker => {
                if self.snap.state.is_answered() {
                    self.elapsed_secs += 1;
                }
            }
            TimerId::StatusRotator => {
                if !self.snap.state.is_answered() {
                    self.status_index += 1;
                }
            }
            TimerId::RingTimeout => {
                if !self.snap.state.is_answered() {
                    if let Some(id) = self.snap.call_id.clone() {
                        ctx.send_to_parent(UpMsg::CallEndedLocally(id));
                    }
                }
            }
            TimerId::ToastTtl => {}
        }
    }

    fn on_gesture(&mut self, ctx: &mut Ctx<'_, CalldockProtocol>, gesture: &Gesture) -> bool {
        match gesture {
            Gesture::Enter => {
                if self.snap.state == CallState::Ringing
                    && self.snap.direction == CallDirection::Inbound
                {
                    if let Some(id) = self.snap.call_id.clone() {
                        ctx.send_to_parent(UpMsg::CallAccepted(id));
                    }
                }
                true
            }
            Gesture::Char('m') => {
                if let Some(id) = self.snap.call_id.clone().filter(|_| self.snap.is_live()) {
                    self.snap.muted = !self.snap.muted;
                    ctx.effect(Effect::SetMuted(id, self.snap.muted));
                }
                true
            }
            Gesture::Char('v') => {
                if let Some(id) = self.snap.call_id.clone().filter(|_| self.snap.is_live()) {
                    self.snap.video_on = !self.snap.video_on;
                    ctx.effect(Effect::SetVideo(id, self.snap.video_on));
                }
                true
            }
            Gesture::Esc | Gesture::Char('e') => {
                if let Some(id) = self.snap.call_id.clone() {
                    ctx.send_to_parent(UpMsg::CallEndedLocally(id));
                }
                true
            }
            _ => false,
        }
    }

    fn surface(&self, _tree: &Tree<CalldockProtocol>, _me: NodeId) -> Surface {
        let answered = self.snap.state.is_answered();
        let state_line = if answered {
            self.snap.state.to_string()
        } else if self.snap.state == CallState::Ended {
            match self.snap.end_reason {
                Some(reason) => format!("ended: {reason}"),
                None => "ended".to_string(),
            }
        } else {
            STATUS_LINES[self.status_index % STATUS_LINES.len()].to_string()
        };
        Surface::CallFace {
            remote: self.snap.peer.display_name().to_string(),
            state_line,
            duration: answered.then(|| format_duration(self.elapsed_secs)),
            muted: self.snap.muted,
            video_on: self.snap.video_on,
            controls: call_controls(&self.snap),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calldock_core::tree::Tree;
    use calldock_core::types::{CallId, CallKind, Peer, UserId};

    use crate::elements::testing::Host;

    fn ringing_snapshot() -> CallSnapshot {
        CallSnapshot {
            call_id: Some(CallId::new("c1")),
            peer: Peer::new("alice"),
            kind: CallKind::Voice,
            direction: CallDirection::Inbound,
            state: CallState::Ringing,
            muted: false,
            video_on: false,
            duration_secs: None,
            end_reason: None,
        }
    }

    fn setup(snap: CallSnapshot) -> (Tree<CalldockProtocol>, NodeId, NodeId) {
        let mut tree: Tree<CalldockProtocol> = Tree::new();
        let root = tree.attach_root(Host::boxed()).unwrap();
        let call = tree.attach(root, Box::new(CallView::new(snap))).unwrap();
        tree.set_focus(call);
        tree.take_effects();
        (tree, root, call)
    }

    #[test]
    fn test_attach_starts_three_timers() {
        let mut tree: Tree<CalldockProtocol> = Tree::new();
        let root = tree.attach_root(Host::boxed()).unwrap();
        tree.attach(root, Box::new(CallView::new(ringing_snapshot())))
            .unwrap();

        let timers: Vec<TimerId> = tree
            .take_effects()
            .into_iter()
            .filter_map(|e| match e {
                Effect::StartTimer { timer, .. } => Some(timer),
                _ => None,
            })
            .collect();
        assert_eq!(
            timers,
            vec![
                TimerId::CallTicker,
                TimerId::StatusRotator,
                TimerId::RingTimeout
            ]
        );
    }

    #[test]
    fn test_enter_accepts_inbound_ring() {
        let (mut tree, root, _call) = setup(ringing_snapshot());
        tree.dispatch_gesture(&Gesture::Enter);
        let host = tree.get::<Host>(root).unwrap();
        assert_eq!(host.up_msgs, vec![UpMsg::CallAccepted(CallId::new("c1"))]);
    }

    #[test]
    fn test_enter_on_outbound_does_nothing() {
        let mut snap = CallSnapshot::dialing(&UserId::new("bob"), CallKind::Voice);
        snap.call_id = Some(CallId::new("c2"));
        let (mut tree, root, _call) = setup(snap);
        tree.dispatch_gesture(&Gesture::Enter);
        assert!(tree.get::<Host>(root).unwrap().up_msgs.is_empty());
    }

    #[test]
    fn test_media_toggles_queue_effects() {
        let mut snap = ringing_snapshot();
        snap.state = CallState::Connected;
        let (mut tree, _root, call) = setup(snap);

        tree.dispatch_gesture(&Gesture::Char('m'));
        tree.dispatch_gesture(&Gesture::Char('v'));
        let effects = tree.take_effects();
        assert!(matches!(effects[0], Effect::SetMuted(_, true)));
        assert!(matches!(effects[1], Effect::SetVideo(_, true)));

        let view = tree.get::<CallView>(call).unwrap();
        assert!(view.snap.muted);
        assert!(view.snap.video_on);
    }

    #[test]
    fn test_connect_update_stops_waiting_timers() {
        let (mut tree, _root, call) = setup(ringing_snapshot());
        let mut update = ringing_snapshot();
        update.state = CallState::Connected;
        tree.send_down(call, DownMsg::CallChanged(update));

        let stopped: Vec<TimerId> = tree
            .take_effects()
            .into_iter()
            .filter_map(|e| match e {
                Effect::StopTimer { timer, .. } => Some(timer),
                _ => None,
            })
            .collect();
        assert_eq!(stopped, vec![TimerId::StatusRotator, TimerId::RingTimeout]);
    }

    #[test]
    fn test_update_for_other_call_is_ignored() {
        let (mut tree, _root, call) = setup(ringing_snapshot());
        let mut other = ringing_snapshot();
        other.call_id = Some(CallId::new("other"));
        other.state = CallState::Connected;
        tree.send_down(call, DownMsg::CallChanged(other));

        let view = tree.get::<CallView>(call).unwrap();
        assert_eq!(view.snap.state, CallState::Ringing);
    }

    #[test]
    fn test_outbound_adopts_call_id_from_first_update() {
        let snap = CallSnapshot::dialing(&UserId::new("bob"), CallKind::Voice);
        let (mut tree, _root, call) = setup(snap);

        let mut update = CallSnapshot::dialing(&UserId::new("bob"), CallKind::Voice);
        update.call_id = Some(CallId::new("c9"));
        tree.send_down(call, DownMsg::CallChanged(update));

        let view = tree.get::<CallView>(call).unwrap();
        assert_eq!(view.snap.call_id, Some(CallId::new("c9")));
    }

    #[test]
    fn test_ring_timeout_ends_unanswered_call() {
        let (mut tree, root, call) = setup(ringing_snapshot());
        tree.dispatch_timer(call, TimerId::RingTimeout);
        let host = tree.get::<Host>(root).unwrap();
        assert_eq!(
            host.up_msgs,
            vec![UpMsg::CallEndedLocally(CallId::new("c1"))]
        );
    }

    #[test]
    fn test_ticker_advances_duration_only_when_answered() {
        let (mut tree, _root, call) = setup(ringing_snapshot());
        tree.dispatch_timer(call, TimerId::CallTicker);
        assert_eq!(tree.get::<CallView>(call).unwrap().elapsed_secs, 0);

        let mut update = ringing_snapshot();
        update.state = CallState::Connected;
        tree.send_down(call, DownMsg::CallChanged(update));
        tree.dispatch_timer(call, TimerId::CallTicker);
        assert_eq!(tree.get::<CallView>(call).unwrap().elapsed_secs, 1);
    }
}
