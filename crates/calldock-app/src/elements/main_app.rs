//! Session machine: routing, login state, and call ownership.

use std::any::Any;

use calldock_core::surface::Surface;
use calldock_core::tree::{Ctx, Element, NodeId, Tree};
use calldock_core::types::{AppId, CallDirection, CallId, CallState, UserId};

use crate::config::SavedLogin;
use crate::elements::pages::CallView;
use crate::elements::widgets::Toast;
use crate::hooks::HookEvent;
use crate::message::{CallSnapshot, CalldockProtocol, DownMsg, Effect, SessionSnapshot, UpMsg};
use crate::pages::{PageId, Router};

/// Owns the router, the session snapshot, and the at-most-one live call.
///
/// Everything stateful about the widget converges here: pages report intents
/// upward, the shell pushes SDK outcomes downward, and `MainApp` decides what
/// is on screen.
pub struct MainApp {
    session: SessionSnapshot,
    router: Router,
    auto_login: Option<SavedLogin>,
    call_node: Option<NodeId>,
    call_id: Option<CallId>,
    call_ringing: bool,
    toast_node: Option<NodeId>,
}

impl MainApp {
    pub fn new(app_id: AppId, auto_login: Option<SavedLogin>) -> Self {
        Self::with_router(app_id, auto_login, Router::with_default_pages())
    }

    /// Custom router, used by tests to prove navigation fallback.
    pub fn with_router(app_id: AppId, auto_login: Option<SavedLogin>, router: Router) -> Self {
        Self {
            session: SessionSnapshot::logged_out(app_id),
            router,
            auto_login,
            call_node: None,
            call_id: None,
            call_ringing: false,
            toast_node: None,
        }
    }

    pub fn current_page(&self) -> Option<PageId> {
        self.router.current_page()
    }

    /// An inbound call is ringing and nothing has answered or ended it yet.
    pub fn is_ringing(&self) -> bool {
        self.call_ringing
    }

    /// Whether a live call element occupies the session.
    fn is_busy(&self, ctx: &Ctx<'_, CalldockProtocol>) -> bool {
        self.call_node
            .and_then(|node| ctx.get::<CallView>(node))
            .is_some_and(CallView::is_live)
    }

    fn goto(&mut self, ctx: &mut Ctx<'_, CalldockProtocol>, page: PageId) {
        if let Some(resolved) = self.router.navigate(ctx, &self.session, page) {
            ctx.effect(Effect::EmitHook(HookEvent::PageChanged(resolved)));
        }
    }

    fn toast(&mut self, ctx: &mut Ctx<'_, CalldockProtocol>, text: impl Into<String>) {
        if let Some(old) = self.toast_node.take() {
            ctx.remove(old);
        }
        self.toast_node = ctx.attach_child(Toast::new(text));
    }

    fn attach_call(&mut self, ctx: &mut Ctx<'_, CalldockProtocol>, snap: CallSnapshot) {
        self.call_id = snap.call_id.clone();
        self.call_ringing =
            snap.state == CallState::Ringing && snap.direction == CallDirection::Inbound;
        let Some(node) = ctx.attach_child(Box::new(CallView::new(snap))) else {
            return;
        };
        self.call_node = Some(node);
        self.router.show_attached(ctx, PageId::Call, node);
        ctx.effect(Effect::EmitHook(HookEvent::PageChanged(PageId::Call)));
        if let Some(id) = self.call_id.clone() {
            ctx.effect(Effect::EmitHook(HookEvent::CallStarted(id)));
        }
    }

    /// Tear down the call element and land back on a sensible page.
    fn finish_call(&mut self, ctx: &mut Ctx<'_, CalldockProtocol>) {
        self.call_ringing = false;
        if let Some(node) = self.call_node.take() {
            ctx.remove(node);
        }
        if let Some(id) = self.call_id.take() {
            ctx.effect(Effect::EmitHook(HookEvent::CallEnded(id)));
        }
        let home = if self.session.is_logged_in() {
            PageId::Dial
        } else {
            PageId::Login
        };
        self.goto(ctx, home);
    }

    fn on_call_update(&mut self, ctx: &mut Ctx<'_, CalldockProtocol>, snap: CallSnapshot) {
        let known = self.call_id.is_some() && self.call_id == snap.call_id;
        let inbound_ring =
            snap.state == CallState::Ringing && snap.direction == CallDirection::Inbound;

        if inbound_ring && !known {
            if self.is_busy(ctx) {
                // Second incoming call while one is live: busy-signal it.
                if let Some(id) = snap.call_id {
                    tracing::info!(call = %id, "busy, auto-declining inbound call");
                    ctx.effect(Effect::DeclineBusy(id));
                }
                return;
            }
            self.attach_call(ctx, snap);
            ctx.send_to_parent(UpMsg::WidgetRinging);
            return;
        }

        // Updates for a call we never attached (e.g. the end notice of an
        // auto-declined second call) must not touch the current one.
        if let (Some(current), Some(incoming)) = (&self.call_id, &snap.call_id) {
            if current != incoming {
                tracing::trace!(call = %incoming, "ignoring update for a call not on screen");
                return;
            }
        }
        if self.call_node.is_none() && snap.call_id.is_some() && !snap.is_live() {
            // Terminal notice for a call that is already gone.
            return;
        }

        // Update for the current call (an outbound dial adopts its id from
        // the first resolved snapshot).
        if self.call_id.is_none() {
            self.call_id = snap.call_id.clone();
            if let Some(id) = self.call_id.clone() {
                ctx.effect(Effect::EmitHook(HookEvent::CallStarted(id)));
            }
        }
        if snap.state != CallState::Ringing {
            self.call_ringing = false;
        }
        let ended = !snap.is_live();
        let reason = snap.end_reason;
        ctx.send_to_children(DownMsg::CallChanged(snap));
        if ended {
            if let Some(reason) = reason {
                self.toast(ctx, format!("Call ended: {reason}"));
            }
            self.finish_call(ctx);
        }
    }
}

impl Element<CalldockProtocol> for MainApp {
    fn kind(&self) -> &'static str {
        "main-app"
    }

    fn on_attached(&mut self, ctx: &mut Ctx<'_, CalldockProtocol>) {
        if let Some(login) = self.auto_login.take() {
            if !login.user_id.is_empty() {
                ctx.effect(Effect::Authenticate {
                    user_id: UserId::new(login.user_id),
                    access_token: login.access_token,
                });
            }
        }
        self.goto(ctx, PageId::Login);
    }

    fn recv_up(&mut self, ctx: &mut Ctx<'_, CalldockProtocol>, _child: NodeId, msg: UpMsg) {
        match msg {
            UpMsg::LoginSubmitted {
                user_id,
                access_token,
            } => {
                ctx.effect(Effect::Authenticate {
                    user_id,
                    access_token,
                });
            }
            UpMsg::DialRequested { callee, kind } => {
                if self.is_busy(ctx) {
                    self.toast(ctx, "Already in a call");
                    return;
                }
                ctx.effect(Effect::Dial {
                    callee: callee.clone(),
                    kind,
                });
                self.attach_call(ctx, CallSnapshot::dialing(&callee, kind));
            }
            UpMsg::CallAccepted(id) => {
                self.call_ringing = false;
                ctx.effect(Effect::Accept(id));
            }
            UpMsg::CallEndedLocally(id) => {
                ctx.effect(Effect::End(id));
                self.finish_call(ctx);
            }
            UpMsg::MenuSelected(entry) => self.goto(ctx, entry.page()),
            UpMsg::NavigateTo(page) => self.goto(ctx, page),
            UpMsg::BackRequested => {
                let home = if self.session.is_logged_in() {
                    PageId::Dial
                } else {
                    PageId::Login
                };
                self.goto(ctx, home);
            }
            UpMsg::DeauthenticateRequested => {
                self.session.user = None;
                if let Some(id) = self.call_id.clone() {
                    ctx.effect(Effect::End(id));
                    self.finish_call(ctx);
                }
                ctx.effect(Effect::Deauthenticate);
                ctx.send_to_children(DownMsg::SessionChanged(self.session.clone()));
                self.goto(ctx, PageId::Login);
                ctx.effect(Effect::EmitHook(HookEvent::LoggedOut));
            }
            UpMsg::DeviceSelected { kind, id } => {
                ctx.effect(Effect::SelectDevice { kind, id });
            }
            UpMsg::ToastExpired => {
                if let Some(node) = self.toast_node.take() {
                    ctx.remove(node);
                }
            }
            // Container concerns pass through to the widget shell above.
            UpMsg::WidgetCloseRequested => ctx.send_to_parent(UpMsg::WidgetCloseRequested),
            UpMsg::WidgetRinging => {}
            // The call-log page fetches with its own guards.
            UpMsg::LoadMoreRequested => {}
        }
    }

    fn recv_down(&mut self, ctx: &mut Ctx<'_, CalldockProtocol>, msg: DownMsg) {
        match msg {
            DownMsg::SessionChanged(snap) => {
                let was_logged_in = self.session.is_logged_in();
                self.session = snap.clone();
                ctx.send_to_children(DownMsg::SessionChanged(snap.clone()));
                if !was_logged_in {
                    if let Some(user) = snap.user {
                        self.goto(ctx, PageId::Dial);
                        ctx.effect(Effect::EmitHook(HookEvent::LoginSucceeded(user)));
                    }
                }
            }
            DownMsg::AuthFailed { message } => {
                self.toast(ctx, message.clone());
                ctx.effect(Effect::EmitHook(HookEvent::LoginFailed {
                    message: message.clone(),
                }));
                ctx.send_to_children(DownMsg::AuthFailed { message });
            }
            DownMsg::CallChanged(snap) => self.on_call_update(ctx, snap),
            DownMsg::DialFailed { message } => {
                self.toast(ctx, message);
                self.finish_call(ctx);
            }
            DownMsg::ConnectionLost { reason } => {
                self.session.connected = false;
                self.toast(ctx, format!("Connection lost: {reason}"));
                ctx.send_to_children(DownMsg::ConnectionLost { reason });
            }
            DownMsg::LogPageLoaded { .. } | DownMsg::DevicesChanged(_) => {
                ctx.send_to_children(msg);
            }
            DownMsg::LogLoadFailed { message } => {
                self.toast(ctx, message.clone());
                ctx.send_to_children(DownMsg::LogLoadFailed { message });
            }
        }
    }

    fn surface(&self, tree: &Tree<CalldockProtocol>, me: NodeId) -> Surface {
        // Pages first, toasts on top.
        let mut layers = Vec::new();
        let mut toasts = Vec::new();
        for &child in tree.children_of(me) {
            let surface = tree.surface_of(child);
            if tree.kind_of(child) == Some("toast") {
                toasts.push(surface);
            } else {
                layers.push(surface);
            }
        }
        layers.extend(toasts);
        Surface::Stack { layers }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
