//! Test probes for element unit tests.

use std::any::Any;

use calldock_core::surface::Surface;
use calldock_core::tree::{Ctx, Element, NodeId, Tree};

use crate::message::{CalldockProtocol, DownMsg, UpMsg};

/// Root element that records everything its children report upward.
#[derive(Default)]
pub struct Host {
    pub up_msgs: Vec<UpMsg>,
}

impl Host {
    pub fn boxed() -> Box<Self> {
        Box::default()
    }
}

impl Element<CalldockProtocol> for Host {
    fn kind(&self) -> &'static str {
        "host"
    }

    fn recv_up(&mut self, _ctx: &mut Ctx<'_, CalldockProtocol>, _child: NodeId, msg: UpMsg) {
        self.up_msgs.push(msg);
    }

    fn recv_down(&mut self, ctx: &mut Ctx<'_, CalldockProtocol>, msg: DownMsg) {
        ctx.send_to_children(msg);
    }

    fn surface(&self, tree: &Tree<CalldockProtocol>, me: NodeId) -> Surface {
        Surface::Stack {
            layers: tree
                .children_of(me)
                .iter()
                .map(|&child| tree.surface_of(child))
                .collect(),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
