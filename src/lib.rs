//! calldock - a floating voice/video calling widget for terminal hosts
//!
//! Thin facade over the workspace crates. Hosts that embed the widget
//! directly should depend on `calldock-app`; this crate wires the terminal
//! reference host together.

pub use calldock_app::{CallWidget, HookEvent, Settings, WidgetInput};
pub use calldock_tui::{run, RunOptions};
