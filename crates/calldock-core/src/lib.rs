//! # calldock-core - Element Tree and Domain Types
//!
//! Foundation crate for calldock. Provides the arena-backed element tree,
//! abstract surfaces, calling domain types, error handling, and logging
//! setup.
//!
//! This crate has **zero internal dependencies** and no async runtime -- it
//! only depends on external crates (serde, chrono, thiserror, tracing).
//!
//! ## Public API
//!
//! ### Element Tree (`tree`)
//! - [`Tree`] - Generational arena owning every element of a widget
//! - [`NodeId`] - Copyable, staleness-detecting node handle
//! - [`Element`] - Behavior trait: lifecycle, messaging, gestures, surfaces
//! - [`Protocol`] - Message/effect types a tree is wired with
//! - [`Ctx`] - Tree handle passed to element hooks
//!
//! ### Surfaces (`surface`)
//! - [`Surface`] - Abstract view description interpreted by an adapter
//! - [`FormField`], [`RowItem`] - Building blocks for forms and lists
//!
//! ### Domain Types (`types`)
//! - [`AppId`], [`UserId`], [`CallId`] - Identifiers
//! - [`CallState`], [`CallDirection`], [`CallKind`], [`EndReason`] - Call lifecycle
//! - [`Peer`], [`CallRecord`], [`MediaDevice`] - Peers, log entries, devices
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use calldock_core::prelude::*;
//! ```

pub mod error;
pub mod logging;
pub mod prelude;
pub mod surface;
pub mod tree;
pub mod types;

// Re-export commonly used types at crate root for convenience
pub use error::{Error, Result, ResultExt};
pub use surface::{FormField, RowItem, Surface};
pub use tree::{Ctx, Element, NodeId, Protocol, Tree};
pub use types::{
    format_duration, AppId, CallDirection, CallId, CallKind, CallRecord, CallState, EndReason,
    MediaDevice, MediaDeviceKind, Peer, UserId,
};
