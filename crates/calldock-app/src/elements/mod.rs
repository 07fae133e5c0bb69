//! The widget's element family.
//!
//! `WidgetApp` wraps `MainApp`, which swaps page elements in and out through
//! the router; pages compose the reusable widgets.

pub mod main_app;
pub mod pages;
pub mod widget_app;
pub mod widgets;

#[cfg(test)]
pub mod testing;

pub use main_app::MainApp;
pub use widget_app::WidgetApp;
