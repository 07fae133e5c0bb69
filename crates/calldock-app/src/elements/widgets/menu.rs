//! Vertical selection menu.

use std::any::Any;

use calldock_core::surface::Surface;
use calldock_core::tree::{Ctx, Element, NodeId, Tree};

use crate::message::{CalldockProtocol, Gesture, MenuEntry, UpMsg};

/// Wrapping selection list over [`MenuEntry`] rows. Focus is handed back to
/// the parent on Esc or Tab.
pub struct MenuWidget {
    entries: Vec<MenuEntry>,
    selected: usize,
}

impl MenuWidget {
    pub fn new(entries: Vec<MenuEntry>) -> Box<Self> {
        Box::new(Self {
            entries,
            selected: 0,
        })
    }

    pub fn selected(&self) -> Option<MenuEntry> {
        self.entries.get(self.selected).copied()
    }
}

impl Element<CalldockProtocol> for MenuWidget {
    fn kind(&self) -> &'static str {
        "menu"
    }

    fn on_gesture(&mut self, ctx: &mut Ctx<'_, CalldockProtocol>, gesture: &Gesture) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        match gesture {
            Gesture::Up => {
                self.selected = self
                    .selected
                    .checked_sub(1)
                    .unwrap_or(self.entries.len() - 1);
                true
            }
            Gesture::Down => {
                self.selected = (self.selected + 1) % self.entries.len();
                true
            }
            Gesture::Enter => {
                if let Some(entry) = self.selected() {
                    ctx.send_to_parent(UpMsg::MenuSelected(entry));
                }
                true
            }
            Gesture::Esc | Gesture::Tab => {
                if let Some(parent) = ctx.parent() {
                    ctx.focus(parent);
                }
                true
            }
            _ => false,
        }
    }

    fn surface(&self, _tree: &Tree<CalldockProtocol>, _me: NodeId) -> Surface {
        Surface::Menu {
            items: self.entries.iter().map(|e| e.label().to_string()).collect(),
            selected: self.selected,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
