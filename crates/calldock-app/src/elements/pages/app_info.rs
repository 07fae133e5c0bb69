//! Static application info panel.

use std::any::Any;

use calldock_core::surface::Surface;
use calldock_core::tree::{Ctx, Element, NodeId, Tree};

use crate::message::{CalldockProtocol, DownMsg, Gesture, SessionSnapshot, UpMsg};

pub struct AppInfoView {
    session: SessionSnapshot,
}

impl AppInfoView {
    pub fn new(session: &SessionSnapshot) -> Self {
        Self {
            session: session.clone(),
        }
    }
}

impl Element<CalldockProtocol> for AppInfoView {
    fn kind(&self) -> &'static str {
        "app-info"
    }

    fn recv_down(&mut self, _ctx: &mut Ctx<'_, CalldockProtocol>, msg: DownMsg) {
        match msg {
            DownMsg::SessionChanged(session) => self.session = session,
            DownMsg::ConnectionLost { .. } => self.session.connected = false,
            _ => {}
        }
    }

    fn on_gesture(&mut self, ctx: &mut Ctx<'_, CalldockProtocol>, gesture: &Gesture) -> bool {
        match gesture {
            Gesture::Esc | Gesture::Backspace | Gesture::Enter => {
                ctx.send_to_parent(UpMsg::BackRequested);
                true
            }
            _ => false,
        }
    }

    fn surface(&self, _tree: &Tree<CalldockProtocol>, _me: NodeId) -> Surface {
        let user = match &self.session.user {
            Some(user) => user.display_name().to_string(),
            None => "-".to_string(),
        };
        let connection = if self.session.connected {
            "connected"
        } else {
            "disconnected"
        };
        Surface::Panel {
            title: "App info".to_string(),
            body: vec![
                format!("calldock v{}", env!("CARGO_PKG_VERSION")),
                format!("App: {}", self.session.app_id),
                format!("User: {user}"),
                format!("Connection: {connection}"),
            ],
            footer: Some("Esc to go back".to_string()),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
