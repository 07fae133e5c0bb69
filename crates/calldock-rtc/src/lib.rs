//! # calldock-rtc - Signaling Client and Call Handles
//!
//! Connects the widget to the calling service: a JSON frame protocol over a
//! pluggable transport, an actor-style client that multiplexes requests and
//! notices, shared call handles, device selection, and call-log pagination.
//!
//! ## Public API
//!
//! ### Protocol (`protocol`)
//! - [`Frame`] - Every message on the signaling wire
//! - [`encode_frame`], [`parse_frame`] - JSON line codec
//!
//! ### Transports (`transport`)
//! - [`SignalTransport`] - Async send/recv seam the client runs over
//! - [`WsTransport`] - WebSocket transport for a real service endpoint
//! - [`LoopbackSwitch`] - In-process service for tests and demo mode
//!
//! ### Client (`client`)
//! - [`CallClient`] - Authenticated session; dial, call log, shutdown
//! - [`SdkEvent`] - Unsolicited events the widget reacts to
//!
//! ### Calls (`call`)
//! - [`DirectCall`] - Clonable handle to one call: accept, end, media toggles
//!
//! ### Devices (`devices`)
//! - [`MediaDeviceRegistry`] - Device lists and per-kind selection
//!
//! ### Call Log (`call_log`)
//! - [`CallLogQuery`], [`CallLogPage`] - Cursor pagination types

pub mod call;
pub mod call_log;
pub mod client;
pub mod devices;
pub mod protocol;
pub mod transport;

pub use call::DirectCall;
pub use call_log::{CallLogPage, CallLogQuery, DEFAULT_PAGE_LIMIT};
pub use client::{CallClient, SdkEvent, WireCommand};
pub use devices::MediaDeviceRegistry;
pub use protocol::{encode_frame, parse_frame, Frame};
pub use transport::{
    build_endpoint_url, LocalSignalTransport, LoopbackSwitch, LoopbackTransport, SignalTransport,
    WsTransport,
};
