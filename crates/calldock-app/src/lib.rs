//! The embeddable calling widget.
//!
//! This crate assembles the element tree from `calldock-core` and the
//! signaling client from `calldock-rtc` into [`widget::CallWidget`], a
//! self-contained floating widget a host application pumps inputs into and
//! renders surfaces out of. Host integration points are the input channel,
//! the [`hooks::HookEvent`] stream, and persisted [`config::Settings`].

pub mod config;
pub mod elements;
pub mod hooks;
pub mod message;
pub mod pages;
pub mod periodic;
pub mod widget;

pub use config::{config_dir, load_settings, save_settings, Corner, Settings};
pub use elements::{MainApp, WidgetApp};
pub use hooks::{hook_channel, HookEvent, HookSender, OpenReason};
pub use message::{
    CallSnapshot, CalldockProtocol, DeviceSnapshot, DownMsg, Effect, Gesture, SessionSnapshot,
    TimerId, UpMsg,
};
pub use pages::{PageId, Router};
pub use widget::{CallWidget, WidgetInput};
