//! Floating container: open/closed state around the session machine.

use std::any::Any;

use calldock_core::surface::Surface;
use calldock_core::tree::{Ctx, Element, NodeId, Tree};

use crate::config::Corner;
use crate::elements::main_app::MainApp;
use crate::hooks::{HookEvent, OpenReason};
use crate::message::{CalldockProtocol, Effect, Gesture, UpMsg};

/// The dockable root element. Closed, it renders nothing; the host shows a
/// dock icon in its place. A ringing call opens it on its own.
pub struct WidgetApp {
    open: bool,
    corner: Corner,
    seed: Option<MainApp>,
}

impl WidgetApp {
    pub fn new(corner: Corner, start_open: bool, main: MainApp) -> Self {
        Self {
            open: start_open,
            corner,
            seed: Some(main),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn corner(&self) -> Corner {
        self.corner
    }

    fn set_open(&mut self, ctx: &mut Ctx<'_, CalldockProtocol>, open: bool, reason: OpenReason) {
        if self.open == open {
            return;
        }
        self.open = open;
        let event = if open {
            HookEvent::WidgetOpened { reason }
        } else {
            HookEvent::WidgetClosed
        };
        ctx.effect(Effect::EmitHook(event));
    }
}

impl Element<CalldockProtocol> for WidgetApp {
    fn kind(&self) -> &'static str {
        "widget-app"
    }

    fn on_attached(&mut self, ctx: &mut Ctx<'_, CalldockProtocol>) {
        if let Some(main) = self.seed.take() {
            ctx.attach_child(Box::new(main));
        }
    }

    fn recv_up(&mut self, ctx: &mut Ctx<'_, CalldockProtocol>, _child: NodeId, msg: UpMsg) {
        match msg {
            UpMsg::WidgetRinging => self.set_open(ctx, true, OpenReason::Ring),
            UpMsg::WidgetCloseRequested => self.set_open(ctx, false, OpenReason::Manual),
            // Session-level messages stop at the session machine below.
            _ => {}
        }
    }

    fn on_gesture(&mut self, ctx: &mut Ctx<'_, CalldockProtocol>, gesture: &Gesture) -> bool {
        match gesture {
            Gesture::ToggleWidget => {
                let open = !self.open;
                self.set_open(ctx, open, OpenReason::Manual);
                true
            }
            _ => false,
        }
    }

    fn surface(&self, tree: &Tree<CalldockProtocol>, me: NodeId) -> Surface {
        if !self.open {
            return Surface::None;
        }
        match tree.children_of(me).first() {
            Some(&child) => tree.surface_of(child),
            None => Surface::None,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
