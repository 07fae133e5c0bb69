//! Media device enumeration and selection.
//!
//! There is no real capture pipeline behind these (see the crate docs);
//! the registry tracks which device of each kind the user picked so the
//! settings page and persisted configuration agree on it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use calldock_core::prelude::*;
use calldock_core::types::{MediaDevice, MediaDeviceKind};

struct KindSlot {
    devices: Vec<MediaDevice>,
    selected: usize,
}

/// Shared registry of selectable devices, one selection per kind.
#[derive(Clone)]
pub struct MediaDeviceRegistry {
    slots: Arc<Mutex<HashMap<MediaDeviceKind, KindSlot>>>,
}

impl Default for MediaDeviceRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl MediaDeviceRegistry {
    /// Registry seeded with the platform default device per kind.
    pub fn with_defaults() -> Self {
        let seeded = [
            (
                MediaDeviceKind::AudioInput,
                vec![
                    MediaDevice::new("mic-default", "Default microphone", MediaDeviceKind::AudioInput),
                    MediaDevice::new("mic-headset", "Headset microphone", MediaDeviceKind::AudioInput),
                ],
            ),
            (
                MediaDeviceKind::AudioOutput,
                vec![
                    MediaDevice::new("spk-default", "Default speaker", MediaDeviceKind::AudioOutput),
                    MediaDevice::new("spk-headset", "Headset", MediaDeviceKind::AudioOutput),
                ],
            ),
            (
                MediaDeviceKind::VideoInput,
                vec![MediaDevice::new(
                    "cam-default",
                    "Built-in camera",
                    MediaDeviceKind::VideoInput,
                )],
            ),
        ];
        let slots = seeded
            .into_iter()
            .map(|(kind, devices)| {
                (
                    kind,
                    KindSlot {
                        devices,
                        selected: 0,
                    },
                )
            })
            .collect();
        Self {
            slots: Arc::new(Mutex::new(slots)),
        }
    }

    /// Registry with an explicit device set (tests, host-provided lists).
    pub fn with_devices(devices: Vec<MediaDevice>) -> Self {
        let mut slots: HashMap<MediaDeviceKind, KindSlot> = HashMap::new();
        for device in devices {
            slots
                .entry(device.kind)
                .or_insert_with(|| KindSlot {
                    devices: Vec::new(),
                    selected: 0,
                })
                .devices
                .push(device);
        }
        Self {
            slots: Arc::new(Mutex::new(slots)),
        }
    }

    /// All devices of one kind, in discovery order.
    pub fn list(&self, kind: MediaDeviceKind) -> Vec<MediaDevice> {
        self.slots
            .lock()
            .unwrap()
            .get(&kind)
            .map(|slot| slot.devices.clone())
            .unwrap_or_default()
    }

    /// Every known device across all kinds.
    pub fn list_all(&self) -> Vec<MediaDevice> {
        MediaDeviceKind::ALL
            .iter()
            .flat_map(|kind| self.list(*kind))
            .collect()
    }

    /// The currently selected device of a kind, if any exist.
    pub fn current(&self, kind: MediaDeviceKind) -> Option<MediaDevice> {
        self.slots
            .lock()
            .unwrap()
            .get(&kind)
            .and_then(|slot| slot.devices.get(slot.selected).cloned())
    }

    /// Select a device by id. Unknown ids are an error and leave the
    /// selection unchanged.
    pub fn select(&self, kind: MediaDeviceKind, id: &str) -> Result<MediaDevice> {
        let mut slots = self.slots.lock().unwrap();
        let slot = slots
            .get_mut(&kind)
            .ok_or_else(|| Error::unknown_device(id))?;
        let index = slot
            .devices
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| Error::unknown_device(id))?;
        slot.selected = index;
        Ok(slot.devices[index].clone())
    }
}
