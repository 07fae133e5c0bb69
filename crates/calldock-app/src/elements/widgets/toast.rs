//! Short-lived notification element.

use std::any::Any;
use std::time::Duration;

use calldock_core::surface::Surface;
use calldock_core::tree::{Ctx, Element, NodeId, Tree};

use crate::message::{CalldockProtocol, Effect, TimerId, UpMsg};

/// How long a toast stays on screen.
pub const TOAST_TTL: Duration = Duration::from_secs(3);

/// One-line notification. Parents keep at most one; a new toast replaces the
/// old. When its time-to-live runs out it asks the parent to remove it.
pub struct Toast {
    text: String,
}

impl Toast {
    pub fn new(text: impl Into<String>) -> Box<Self> {
        Box::new(Self { text: text.into() })
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Element<CalldockProtocol> for Toast {
    fn kind(&self) -> &'static str {
        "toast"
    }

    fn on_attached(&mut self, ctx: &mut Ctx<'_, CalldockProtocol>) {
        ctx.effect(Effect::StartTimer {
            node: ctx.me(),
            timer: TimerId::ToastTtl,
            period: TOAST_TTL,
        });
    }

    fn on_removed(&mut self, ctx: &mut Ctx<'_, CalldockProtocol>) {
        ctx.effect(Effect::StopTimer {
            node: ctx.me(),
            timer: TimerId::ToastTtl,
        });
    }

    fn on_timer(&mut self, ctx: &mut Ctx<'_, CalldockProtocol>, timer: TimerId) {
        if timer == TimerId::ToastTtl {
            ctx.send_to_parent(UpMsg::ToastExpired);
        }
    }

    fn surface(&self, _tree: &Tree<CalldockProtocol>, _me: NodeId) -> Surface {
        Surface::Toast {
            text: self.text.clone(),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
