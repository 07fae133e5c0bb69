//! Small reusable elements and row builders.

pub mod call_buttons;
pub mod call_log_item;
pub mod menu;
pub mod toast;

pub use call_buttons::call_controls;
pub use call_log_item::call_log_row;
pub use menu::MenuWidget;
pub use toast::{Toast, TOAST_TTL};
