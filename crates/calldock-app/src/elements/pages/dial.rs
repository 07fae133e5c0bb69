//! Dial page: callee input, call kind toggle, navigation menu.

use std::any::Any;

use calldock_core::surface::{FormField, Surface};
use calldock_core::tree::{Ctx, Element, NodeId, Tree};
use calldock_core::types::{CallKind, UserId};

use crate::elements::widgets::MenuWidget;
use crate::message::{CalldockProtocol, DownMsg, Gesture, MenuEntry, SessionSnapshot, UpMsg};

/// The main page of a signed-in session.
pub struct DialView {
    session: SessionSnapshot,
    callee: String,
    kind: CallKind,
}

impl DialView {
    pub fn new(session: &SessionSnapshot) -> Self {
        Self {
            session: session.clone(),
            callee: String::new(),
            kind: CallKind::Voice,
        }
    }

    pub fn kind(&self) -> CallKind {
        self.kind
    }
}

impl Element<CalldockProtocol> for DialView {
    fn kind(&self) -> &'static str {
        "dial"
    }

    fn on_attached(&mut self, ctx: &mut Ctx<'_, CalldockProtocol>) {
        ctx.attach_child(MenuWidget::new(MenuEntry::ALL.to_vec()));
    }

    fn recv_up(&mut self, ctx: &mut Ctx<'_, CalldockProtocol>, _child: NodeId, msg: UpMsg) {
        match msg {
            // The menu reports here; the session machine does the navigating.
            UpMsg::MenuSelected(entry) => ctx.send_to_parent(UpMsg::MenuSelected(entry)),
            _ => {}
        }
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
            Gesture::Char(c) => {
                self.callee.push(*c);
                true
            }
            Gesture::Backspace => {
                self.callee.pop();
                true
            }
            Gesture::Left | Gesture::Right => {
                self.kind = match self.kind {
                    CallKind::Voice => CallKind::Video,
                    CallKind::Video => CallKind::Voice,
                };
                true
            }
            Gesture::Tab | Gesture::Down => {
                if let Some(&menu) = ctx.children().first() {
                    ctx.focus(menu);
                }
                true
            }
            Gesture::Enter => {
                let callee = self.callee.trim();
                if !callee.is_empty() {
                    ctx.send_to_parent(UpMsg::DialRequested {
                        callee: UserId::new(callee),
                        kind: self.kind,
                    });
                }
                true
            }
            Gesture::Esc => {
                ctx.send_to_parent(UpMsg::WidgetCloseRequested);
                true
            }
            _ => false,
        }
    }

    fn surface(&self, tree: &Tree<CalldockProtocol>, me: NodeId) -> Surface {
        let title = match &self.session.user {
            Some(user) => format!("Dial — {}", user.display_name()),
            None => "Dial".to_string(),
        };
        let form = Surface::Form {
            title,
            fields: vec![
                FormField::new("Callee", &self.callee).active(true),
                FormField::new("Kind", format!("{} (←/→)", self.kind)),
            ],
            submit_label: "Enter to call".to_string(),
            error: None,
        };
        let mut layers = vec![form];
        layers.extend(tree.children_of(me).iter().map(|&c| tree.surface_of(c)));
        Surface::Stack { layers }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
