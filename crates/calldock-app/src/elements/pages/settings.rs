//! Media device selection page.

use std::any::Any;

use calldock_core::surface::{RowItem, Surface};
use calldock_core::tree::{Ctx, Element, NodeId, Tree};
use calldock_core::types::{MediaDevice, MediaDeviceKind};

use crate::message::{CalldockProtocol, DeviceSnapshot, DownMsg, Effect, Gesture, UpMsg};

/// Device picker, one section per device kind. The cursor moves over device
/// rows only; section headers are decoration.
pub struct SettingsView {
    devices: DeviceSnapshot,
    cursor: usize,
}

impl Default for SettingsView {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsView {
    pub fn new() -> Self {
        Self {
            devices: DeviceSnapshot::default(),
            cursor: 0,
        }
    }

    /// Devices flattened in section order.
    fn ordered(&self) -> Vec<&MediaDevice> {
        MediaDeviceKind::ALL
            .iter()
            .flat_map(|kind| self.devices.of_kind(*kind))
            .collect()
    }
}

impl Element<CalldockProtocol> for SettingsView {
    fn kind(&self) -> &'static str {
        "settings"
    }

    fn on_attached(&mut self, ctx: &mut Ctx<'_, CalldockProtocol>) {
        ctx.effect(Effect::RefreshDevices);
    }

    fn recv_down(&mut self, _ctx: &mut Ctx<'_, CalldockProtocol>, msg: DownMsg) {
        match msg {
            DownMsg::DevicesChanged(snapshot) => {
                self.devices = snapshot;
                let count = self.ordered().len();
                if count > 0 && self.cursor >= count {
                    self.cursor = count - 1;
                }
            }
            _ => {}
        }
    }

    fn on_gesture(&mut self, ctx: &mut Ctx<'_, CalldockProtocol>, gesture: &Gesture) -> bool {
        match gesture {
            Gesture::Up => {
                self.cursor = self.cursor.saturating_sub(1);
                true
            }
            Gesture::Down => {
                if self.cursor + 1 < self.ordered().len() {
                    self.cursor += 1;
                }
                true
            }
            Gesture::Enter => {
                if let Some(device) = self.ordered().get(self.cursor).copied() {
                    ctx.send_to_parent(UpMsg::DeviceSelected {
                        kind: device.kind,
                        id: device.id.clone(),
                    });
                }
                true
            }
            Gesture::Esc | Gesture::Backspace => {
                ctx.send_to_parent(UpMsg::BackRequested);
                true
            }
            _ => false,
        }
    }

    fn surface(&self, _tree: &Tree<CalldockProtocol>, _me: NodeId) -> Surface {
        let mut items = Vec::new();
        let mut selected = None;
        let mut device_index = 0usize;
        for kind in MediaDeviceKind::ALL {
            items.push(RowItem::new(kind.label(), "").dim());
            for device in self.devices.of_kind(kind) {
                let marker = if self.devices.selected_id(kind) == Some(device.id.as_str()) {
                    "selected"
                } else {
                    ""
                };
                if device_index == self.cursor {
                    selected = Some(items.len());
                }
                items.push(RowItem::new(format!("  {}", device.label), marker));
                device_index += 1;
            }
        }
        Surface::List {
            title: "Settings".to_string(),
            items,
            selected,
            loading_more: false,
            empty_hint: "No devices found".to_string(),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
