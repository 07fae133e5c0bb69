//! calldock-tui - Terminal host for the calldock widget
//!
//! This crate turns the abstract widget from calldock-app into a floating
//! terminal overlay: it polls crossterm for input, maps keys to gestures, and
//! interprets surfaces into ratatui widgets anchored in a screen corner.

pub mod event;
pub mod render;
pub mod runner;
pub mod terminal;
pub mod theme;

// Re-export main entry points
pub use runner::{run, RunOptions};
