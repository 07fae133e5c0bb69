//! The widget shell: runs the element tree against the calling SDK.
//!
//! Inputs converge on one channel. Gestures come from the host, SDK events
//! from the signaling pump, timer ticks from the registry, and async effect
//! completions loop back in as `Async`. The shell drains the tree's effect
//! queue after every input and executes each effect outside the tree.

use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use calldock_core::prelude::*;
use calldock_core::surface::Surface;
use calldock_core::tree::{NodeId, Tree};
use calldock_core::types::{CallId, MediaDeviceKind};
use calldock_rtc::{CallClient, MediaDeviceRegistry, SdkEvent};

use crate::config::{self, Settings};
use crate::elements::{MainApp, WidgetApp};
use crate::hooks::{hook_channel, HookEvent, HookSender};
use crate::message::{
    CallSnapshot, CalldockProtocol, DeviceSnapshot, DownMsg, Effect, Gesture, SessionSnapshot,
    TimerId,
};
use crate::periodic::TimerRegistry;

/// Everything the shell reacts to, in arrival order.
#[derive(Debug)]
pub enum WidgetInput {
    /// Host input routed through the focus chain.
    Gesture(Gesture),
    /// Event from the signaling pump.
    Sdk(SdkEvent),
    /// A periodic tick owned by `node`.
    Timer(NodeId, TimerId),
    /// Completion of an async effect, addressed to the node that asked.
    /// Delivery is dropped silently if the node left the tree meanwhile.
    Async(NodeId, DownMsg),
}

/// The embeddable calling widget.
///
/// The host drives it by forwarding inputs into [`CallWidget::handle`] and
/// rendering [`CallWidget::surface`] after each one.
pub struct CallWidget {
    tree: Tree<CalldockProtocol>,
    client: CallClient,
    devices: MediaDeviceRegistry,
    settings: Settings,
    settings_dir: PathBuf,
    timers: TimerRegistry,
    tasks: Vec<JoinHandle<()>>,
    hooks: HookSender,
    input_tx: mpsc::UnboundedSender<WidgetInput>,
    widget_node: NodeId,
    main_node: NodeId,
}

impl CallWidget {
    /// Assemble the widget over a connected client.
    ///
    /// Returns the widget plus the input channel the host must pump into
    /// [`CallWidget::handle`] and the hook event stream for host callbacks.
    pub fn new(
        client: CallClient,
        sdk_events: mpsc::UnboundedReceiver<SdkEvent>,
        devices: MediaDeviceRegistry,
        settings: Settings,
        settings_dir: PathBuf,
    ) -> Result<(
        Self,
        mpsc::UnboundedReceiver<WidgetInput>,
        mpsc::UnboundedReceiver<HookEvent>,
    )> {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (hooks, hook_rx) = hook_channel();

        // Apply remembered device choices before anything renders.
        for kind in MediaDeviceKind::ALL {
            if let Some(id) = settings.devices.get(kind) {
                if let Err(e) = devices.select(kind, id) {
                    warn!("saved device unavailable: {e}");
                }
            }
        }

        let mut tree = Tree::new();
        let app_id = client.app_id().clone();
        let main = MainApp::new(app_id, settings.auto_login.clone());
        let widget_node = tree
            .attach_root(Box::new(WidgetApp::new(
                settings.widget.corner,
                settings.widget.start_open,
                main,
            )))
            .map_err(|e| Error::tree(format!("attach widget root: {e}")))?;
        let main_node = tree.children_of(widget_node)[0];

        let forwarder = spawn_sdk_forwarder(sdk_events, input_tx.clone());

        let mut widget = Self {
            tree,
            client,
            devices,
            settings,
            settings_dir,
            timers: TimerRegistry::new(input_tx.clone()),
            tasks: vec![forwarder],
            hooks,
            input_tx,
            widget_node,
            main_node,
        };
        widget.flush_effects();
        Ok((widget, input_rx, hook_rx))
    }

    pub fn is_open(&self) -> bool {
        self.tree
            .get::<WidgetApp>(self.widget_node)
            .is_some_and(WidgetApp::is_open)
    }

    /// An unanswered inbound call wants attention. The host renders this on
    /// the dock icon when the widget is closed.
    pub fn is_ringing(&self) -> bool {
        self.tree
            .get::<MainApp>(self.main_node)
            .is_some_and(MainApp::is_ringing)
    }

    pub fn corner(&self) -> config::Corner {
        self.settings.widget.corner
    }

    /// What the widget currently looks like.
    pub fn surface(&self) -> Surface {
        self.tree.surface()
    }

    /// Process one input and execute every effect it produced.
    pub fn handle(&mut self, input: WidgetInput) {
        match input {
            WidgetInput::Gesture(gesture) => {
                // A closed widget only listens for its toggle.
                if !self.is_open() && gesture != Gesture::ToggleWidget {
                    return;
                }
                self.tree.dispatch_gesture(&gesture);
            }
            WidgetInput::Sdk(event) => self.on_sdk_event(event),
            WidgetInput::Timer(node, timer) => {
                if self.tree.contains(node) {
                    self.tree.dispatch_timer(node, timer);
                } else {
                    // The tick raced the node's removal; reap its jobs.
                    self.timers.stop_node(node);
                }
            }
            WidgetInput::Async(node, msg) => {
                self.tree.send_down(node, msg);
            }
        }
        self.flush_effects();
        self.tasks.retain(|t| !t.is_finished());
    }

    /// Stop the pump, the timers, and every in-flight effect task.
    pub fn shutdown(&mut self) {
        self.timers.stop_all();
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.client.shutdown();
    }

    fn on_sdk_event(&mut self, event: SdkEvent) {
        match event {
            SdkEvent::Ringing(call) => {
                info!(call = %call.call_id(), peer = %call.peer().user_id, "inbound call");
                self.send_to_main(DownMsg::CallChanged(CallSnapshot::of_call(&call)));
            }
            SdkEvent::CallConnected(call_id) => {
                if let Some(call) = self.client.call(&call_id) {
                    self.send_to_main(DownMsg::CallChanged(CallSnapshot::of_call(&call)));
                }
            }
            SdkEvent::CallEnded(call_id, reason) => {
                self.send_to_main(DownMsg::CallChanged(CallSnapshot::ended(call_id, reason)));
            }
            SdkEvent::RemoteMediaChanged {
                call_id,
                muted,
                video,
            } => {
                trace!(call = %call_id, muted, video, "remote media changed");
                if let Some(call) = self.client.call(&call_id) {
                    self.send_to_main(DownMsg::CallChanged(CallSnapshot::of_call(&call)));
                }
            }
            SdkEvent::Disconnected { reason } => {
                warn!(%reason, "signaling connection lost");
                self.send_to_main(DownMsg::ConnectionLost { reason });
            }
        }
    }

    fn send_to_main(&mut self, msg: DownMsg) {
        self.tree.send_down(self.main_node, msg);
    }

    fn flush_effects(&mut self) {
        loop {
            let effects = self.tree.take_effects();
            if effects.is_empty() {
                return;
            }
            for effect in effects {
                self.run_effect(effect);
            }
        }
    }

    fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::Authenticate {
                user_id,
                access_token,
            } => {
                let client = self.client.clone();
                let tx = self.input_tx.clone();
                let main = self.main_node;
                let app_id = client.app_id().clone();
                self.tasks.push(tokio::spawn(async move {
                    let msg = match client.authenticate(user_id, access_token).await {
                        Ok(user) => DownMsg::SessionChanged(SessionSnapshot {
                            app_id,
                            user: Some(user),
                            connected: true,
                        }),
                        Err(e) => DownMsg::AuthFailed {
                            message: e.to_string(),
                        },
                    };
                    let _ = tx.send(WidgetInput::Async(main, msg));
                }));
            }
            Effect::Dial { callee, kind } => {
                let client = self.client.clone();
                let tx = self.input_tx.clone();
                let main = self.main_node;
                self.tasks.push(tokio::spawn(async move {
                    let msg = match client.dial(callee, kind).await {
                        Ok(call) => DownMsg::CallChanged(CallSnapshot::of_call(&call)),
                        Err(e) => DownMsg::DialFailed {
                            message: e.to_string(),
                        },
                    };
                    let _ = tx.send(WidgetInput::Async(main, msg));
                }));
            }
            Effect::Accept(call_id) => self.with_call(&call_id, |call| call.accept()),
            Effect::End(call_id) => self.with_call(&call_id, |call| call.end()),
            Effect::DeclineBusy(call_id) => {
                self.with_call(&call_id, |call| {
                    call.decline(calldock_core::types::EndReason::Busy)
                });
            }
            Effect::SetMuted(call_id, muted) => {
                self.with_call(&call_id, |call| {
                    if muted {
                        call.mute_microphone()
                    } else {
                        call.unmute_microphone()
                    }
                });
            }
            Effect::SetVideo(call_id, on) => {
                self.with_call(&call_id, |call| {
                    if on {
                        call.start_video()
                    } else {
                        call.stop_video()
                    }
                });
            }
            Effect::FetchCallLog { cursor, limit } => {
                let client = self.client.clone();
                let tx = self.input_tx.clone();
                let main = self.main_node;
                self.tasks.push(tokio::spawn(async move {
                    let query = calldock_rtc::CallLogQuery { cursor, limit };
                    let msg = match client.query_call_log(query).await {
                        Ok(page) => DownMsg::LogPageLoaded {
                            records: page.records,
                            next_cursor: page.next_cursor,
                        },
                        Err(e) => DownMsg::LogLoadFailed {
                            message: e.to_string(),
                        },
                    };
                    let _ = tx.send(WidgetInput::Async(main, msg));
                }));
            }
            Effect::Deauthenticate => {
                let client = self.client.clone();
                self.tasks.push(tokio::spawn(async move {
                    if let Err(e) = client.deauthenticate().await {
                        warn!("deauthenticate failed: {e}");
                    }
                }));
            }
            Effect::StartTimer {
                node,
                timer,
                period,
            } => self.timers.start(node, timer, period),
            Effect::StopTimer { node, timer } => self.timers.stop(node, timer),
            Effect::SelectDevice { kind, id } => match self.devices.select(kind, &id) {
                Ok(device) => {
                    info!(kind = kind.label(), device = %device.label, "device selected");
                    self.settings.devices.set(kind, id);
                    if let Err(e) = config::save_settings(&self.settings_dir, &self.settings) {
                        warn!("could not persist device selection: {e}");
                    }
                    let snap = self.device_snapshot();
                    self.send_to_main(DownMsg::DevicesChanged(snap));
                }
                Err(e) => warn!("device selection rejected: {e}"),
            },
            Effect::RefreshDevices => {
                let snap = self.device_snapshot();
                self.send_to_main(DownMsg::DevicesChanged(snap));
            }
            Effect::EmitHook(event) => self.hooks.emit(event),
        }
    }

    /// Run a synchronous operation on a tracked call, then push the fresh
    /// snapshot back into the tree.
    fn with_call(
        &mut self,
        call_id: &CallId,
        op: impl FnOnce(&calldock_rtc::DirectCall) -> Result<()>,
    ) {
        let Some(call) = self.client.call(call_id) else {
            debug!(call = %call_id, "operation on a call no longer tracked");
            return;
        };
        if let Err(e) = op(&call) {
            warn!(call = %call_id, "call operation failed: {e}");
        }
        self.send_to_main(DownMsg::CallChanged(CallSnapshot::of_call(&call)));
    }

    fn device_snapshot(&self) -> DeviceSnapshot {
        DeviceSnapshot {
            devices: self.devices.list_all(),
            selected: MediaDeviceKind::ALL
                .iter()
                .filter_map(|&kind| self.devices.current(kind).map(|d| (kind, d.id)))
                .collect(),
        }
    }
}

fn spawn_sdk_forwarder(
    mut sdk_events: mpsc::UnboundedReceiver<SdkEvent>,
    tx: mpsc::UnboundedSender<WidgetInput>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = sdk_events.recv().await {
            if tx.send(WidgetInput::Sdk(event)).is_err() {
                return;
            }
        }
    })
}

/// Convenience for hosts: widget identity plus the `AppId` accessor.
impl std::fmt::Debug for CallWidget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallWidget")
            .field("app_id", self.client.app_id())
            .field("open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use calldock_core::types::{AppId, CallKind, Peer, UserId};
    use calldock_rtc::LoopbackSwitch;

    use crate::pages::PageId;

    /// Bring up a widget for `user` against an in-process switch.
    fn widget_for(
        switch: &LoopbackSwitch,
        user: &str,
        settings: Settings,
        dir: &std::path::Path,
    ) -> (
        CallWidget,
        mpsc::UnboundedReceiver<WidgetInput>,
        mpsc::UnboundedReceiver<HookEvent>,
    ) {
        let transport = switch.register(Peer::new(user));
        let (client, events) = CallClient::connect(AppId::new("demo"), transport);
        CallWidget::new(
            client,
            events,
            MediaDeviceRegistry::with_defaults(),
            settings,
            dir.to_path_buf(),
        )
        .unwrap()
    }

    /// Let spawned tasks run, then feed every queued input back in.
    async fn settle(widget: &mut CallWidget, rx: &mut mpsc::UnboundedReceiver<WidgetInput>) {
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(2)).await;
            while let Ok(input) = rx.try_recv() {
                widget.handle(input);
            }
        }
    }

    fn drain_hooks(rx: &mut mpsc::UnboundedReceiver<HookEvent>) -> Vec<HookEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    async fn login(
        widget: &mut CallWidget,
        rx: &mut mpsc::UnboundedReceiver<WidgetInput>,
        user: &str,
    ) {
        for ch in user.chars() {
            widget.handle(WidgetInput::Gesture(Gesture::Char(ch)));
        }
        widget.handle(WidgetInput::Gesture(Gesture::Enter));
        settle(widget, rx).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_over_loopback() {
        let switch = LoopbackSwitch::new();
        let dir = tempfile::tempdir().unwrap();
        let (mut widget, mut rx, mut hooks) =
            widget_for(&switch, "alice", Settings::default(), dir.path());

        login(&mut widget, &mut rx, "alice").await;

        let main = widget.tree.get::<MainApp>(widget.main_node).unwrap();
        assert_eq!(main.current_page(), Some(PageId::Dial));
        let hooks = drain_hooks(&mut hooks);
        assert!(hooks
            .iter()
            .any(|h| matches!(h, HookEvent::LoginSucceeded(peer) if peer.user_id.as_str() == "alice")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_login_reports_failure() {
        let switch = LoopbackSwitch::new();
        switch.set_access_token(&UserId::new("alice"), "secret");
        let dir = tempfile::tempdir().unwrap();
        let (mut widget, mut rx, mut hooks) =
            widget_for(&switch, "alice", Settings::default(), dir.path());

        // User id only; the required token stays empty.
        login(&mut widget, &mut rx, "alice").await;

        let main = widget.tree.get::<MainApp>(widget.main_node).unwrap();
        assert_eq!(main.current_page(), Some(PageId::Login));
        assert!(drain_hooks(&mut hooks)
            .iter()
            .any(|h| matches!(h, HookEvent::LoginFailed { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dial_rings_and_connects_between_widgets() {
        let switch = LoopbackSwitch::new();
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        let (mut alice, mut rx_a, _hooks_a) =
            widget_for(&switch, "alice", Settings::default(), dir_a.path());
        let mut closed = Settings::default();
        closed.widget.start_open = false;
        let (mut bob, mut rx_b, mut hooks_b) = widget_for(&switch, "bob", closed, dir_b.path());

        login(&mut alice, &mut rx_a, "alice").await;
        login(&mut bob, &mut rx_b, "bob").await;
        assert!(!bob.is_open());

        // Alice dials bob.
        for ch in "bob".chars() {
            alice.handle(WidgetInput::Gesture(Gesture::Char(ch)));
        }
        alice.handle(WidgetInput::Gesture(Gesture::Enter));
        settle(&mut alice, &mut rx_a).await;
        settle(&mut bob, &mut rx_b).await;

        // The ring opened bob's widget on its own.
        assert!(bob.is_open());
        assert!(bob.is_ringing());
        assert!(drain_hooks(&mut hooks_b).iter().any(|h| matches!(
            h,
            HookEvent::WidgetOpened {
                reason: crate::hooks::OpenReason::Ring
            }
        )));

        // Bob accepts; both sides land on a connected call page.
        bob.handle(WidgetInput::Gesture(Gesture::Enter));
        settle(&mut bob, &mut rx_b).await;
        settle(&mut alice, &mut rx_a).await;
        settle(&mut bob, &mut rx_b).await;

        assert!(!bob.is_ringing());
        for widget in [&alice, &bob] {
            let main = widget.tree.get::<MainApp>(widget.main_node).unwrap();
            assert_eq!(main.current_page(), Some(PageId::Call));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hangup_propagates_to_the_peer() {
        let switch = LoopbackSwitch::new();
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        let (mut alice, mut rx_a, _ha) =
            widget_for(&switch, "alice", Settings::default(), dir_a.path());
        let (mut bob, mut rx_b, _hb) =
            widget_for(&switch, "bob", Settings::default(), dir_b.path());
        login(&mut alice, &mut rx_a, "alice").await;
        login(&mut bob, &mut rx_b, "bob").await;

        for ch in "bob".chars() {
            alice.handle(WidgetInput::Gesture(Gesture::Char(ch)));
        }
        alice.handle(WidgetInput::Gesture(Gesture::Enter));
        settle(&mut alice, &mut rx_a).await;
        settle(&mut bob, &mut rx_b).await;
        bob.handle(WidgetInput::Gesture(Gesture::Enter));
        settle(&mut bob, &mut rx_b).await;
        settle(&mut alice, &mut rx_a).await;

        // Alice hangs up; bob's call page goes away too.
        alice.handle(WidgetInput::Gesture(Gesture::Char('e')));
        settle(&mut alice, &mut rx_a).await;
        settle(&mut bob, &mut rx_b).await;

        for widget in [&alice, &bob] {
            let main = widget.tree.get::<MainApp>(widget.main_node).unwrap();
            assert_eq!(main.current_page(), Some(PageId::Dial));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_widget_ignores_gestures() {
        let switch = LoopbackSwitch::new();
        let dir = tempfile::tempdir().unwrap();
        let mut closed = Settings::default();
        closed.widget.start_open = false;
        let (mut widget, mut rx, _hooks) = widget_for(&switch, "alice", closed, dir.path());

        login(&mut widget, &mut rx, "alice").await;
        // Nothing reached the login page while closed.
        let main = widget.tree.get::<MainApp>(widget.main_node).unwrap();
        assert_eq!(main.current_page(), Some(PageId::Login));

        widget.handle(WidgetInput::Gesture(Gesture::ToggleWidget));
        assert!(widget.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_device_selection_persists() {
        let switch = LoopbackSwitch::new();
        let dir = tempfile::tempdir().unwrap();
        let (mut widget, mut rx, _hooks) =
            widget_for(&switch, "alice", Settings::default(), dir.path());
        login(&mut widget, &mut rx, "alice").await;

        widget.handle(WidgetInput::Async(
            widget.main_node,
            DownMsg::SessionChanged(SessionSnapshot {
                app_id: AppId::new("demo"),
                user: Some(Peer::new("alice")),
                connected: true,
            }),
        ));
        // Straight to the settings effect path.
        widget.run_effect(Effect::SelectDevice {
            kind: MediaDeviceKind::AudioInput,
            id: "mic-headset".to_string(),
        });
        widget.flush_effects();

        let saved = config::load_settings(dir.path());
        assert_eq!(
            saved.devices.get(MediaDeviceKind::AudioInput),
            Some("mic-headset")
        );
        assert_eq!(
            widget
                .devices
                .current(MediaDeviceKind::AudioInput)
                .unwrap()
                .id,
            "mic-headset"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_log_fetch_round_trip() {
        use calldock_core::types::{CallDirection, CallRecord, EndReason};
        use chrono::Utc;

        let switch = LoopbackSwitch::new();
        let record = CallRecord {
            call_id: CallId::new("c-old"),
            kind: CallKind::Voice,
            direction: CallDirection::Outbound,
            peer: Peer::new("bob"),
            started_at: Utc::now(),
            duration_secs: 42,
            end_reason: EndReason::Completed,
        };
        switch.seed_log(&UserId::new("alice"), vec![record]);

        let dir = tempfile::tempdir().unwrap();
        let (mut widget, mut rx, _hooks) =
            widget_for(&switch, "alice", Settings::default(), dir.path());
        login(&mut widget, &mut rx, "alice").await;

        // Tab into the menu, pick "Call log".
        widget.handle(WidgetInput::Gesture(Gesture::Tab));
        widget.handle(WidgetInput::Gesture(Gesture::Enter));
        settle(&mut widget, &mut rx).await;

        let main = widget.tree.get::<MainApp>(widget.main_node).unwrap();
        assert_eq!(main.current_page(), Some(PageId::CallLog));
        let Surface::Stack { .. } = widget.surface() else {
            panic!("expected stacked surface");
        };
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_tick_reaps_orphaned_timer() {
        use crate::elements::testing::Host;

        let switch = LoopbackSwitch::new();
        let dir = tempfile::tempdir().unwrap();
        let (mut widget, _rx, _hooks) =
            widget_for(&switch, "alice", Settings::default(), dir.path());

        // A node whose timer outlives it (its removal hook stopped nothing).
        let node = widget
            .tree
            .attach(widget.main_node, Host::boxed())
            .unwrap();
        widget
            .timers
            .start(node, TimerId::CallTicker, Duration::from_secs(1));
        widget.tree.remove(node);
        assert!(widget.timers.is_running(node, TimerId::CallTicker));

        widget.handle(WidgetInput::Timer(node, TimerId::CallTicker));
        assert!(!widget.timers.is_running(node, TimerId::CallTicker));
    }
}
