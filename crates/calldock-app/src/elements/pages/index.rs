//! Fallback landing page.

use std::any::Any;

use calldock_core::surface::Surface;
use calldock_core::tree::{Ctx, Element, NodeId, Tree};

use crate::message::{CalldockProtocol, DownMsg, Gesture, SessionSnapshot, UpMsg};
use crate::pages::PageId;

/// Landing leaf shown when navigation falls back. Always registered, so the
/// router can resolve any request.
pub struct IndexView {
    session: SessionSnapshot,
}

impl IndexView {
    pub fn new(session: &SessionSnapshot) -> Self {
        Self {
            session: session.clone(),
        }
    }
}

impl Element<CalldockProtocol> for IndexView {
    fn kind(&self) -> &'static str {
        "index"
    }

    fn recv_down(&mut self, _ctx: &mut Ctx<'_, CalldockProtocol>, msg: DownMsg) {
        match msg {
            DownMsg::SessionChanged(session) => self.session = session,
            DownMsg::ConnectionLost { .. } => self.session.connected = false,
            DownMsg::AuthFailed { .. }
            | DownMsg::CallChanged(_)
            | DownMsg::DialFailed { .. }
            | DownMsg::LogPageLoaded { .. }
            | DownMsg::LogLoadFailed { .. }
            | DownMsg::DevicesChanged(_) => {}
        }
    }

    fn on_gesture(&mut self, ctx: &mut Ctx<'_, CalldockProtocol>, gesture: &Gesture) -> bool {
        match gesture {
            Gesture::Enter => {
                let target = if self.session.is_logged_in() {
                    PageId::Dial
                } else {
                    PageId::Login
                };
                ctx.send_to_parent(UpMsg::NavigateTo(target));
                true
            }
            Gesture::Esc => {
                ctx.send_to_parent(UpMsg::WidgetCloseRequested);
                true
            }
            _ => false,
        }
    }

    fn surface(&self, _tree: &Tree<CalldockProtocol>, _me: NodeId) -> Surface {
        let user_line = match &self.session.user {
            Some(user) => format!("Signed in as {}", user.display_name()),
            None => "Not signed in".to_string(),
        };
        Surface::Panel {
            title: "calldock".to_string(),
            body: vec![format!("App: {}", self.session.app_id), user_line],
            footer: Some("Enter to continue · Esc to close".to_string()),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
