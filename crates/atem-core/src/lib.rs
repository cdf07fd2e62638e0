//! # atem-core
//!
//! Client-side protocol engine for ATEM video switchers.
//!
//! This crate has no dependencies on sockets, clocks, or OS APIs.  The host
//! supplies a [`Transport`] and a [`Clock`], calls
//! [`AtemConnection::connect`] once, and then calls
//! [`AtemConnection::tick`] every few milliseconds.
//!
//! # Architecture overview (for beginners)
//!
//! ATEM switchers speak a small reliable-messaging protocol on top of UDP
//! port 9910.  The pieces, leaves first:
//!
//! - **`protocol`** – How bytes travel.  A fixed 12-byte header (flags,
//!   length, session id, packet ids) followed by zero or more *command
//!   blocks*, each a 4-character name plus payload.
//!
//! - **`reliability`** – Acknowledgments, heartbeats, and replaying stored
//!   packets when the switcher reports a gap.
//!
//! - **`connection`** – The handshake state machine and the tick loop that
//!   ties everything together.
//!
//! - **`commands`** – Outbound requests (change input, cut, auto, ...) and
//!   the inbound broadcasts that update [`DeviceState`].
//!
//! - **`domain`** – Plain data: connection state, device state, well-known
//!   input ids.
//!
//! # Example
//!
//! ```rust
//! use atem_core::{AtemConnection, ConnectionState, EngineConfig};
//! use atem_core::transport::{ManualClock, Transport, TransportError};
//!
//! struct Loopback;
//! impl Transport for Loopback {
//!     fn send(&mut self, _bytes: &[u8]) -> Result<(), TransportError> { Ok(()) }
//!     fn try_receive(&mut self) -> Option<Vec<u8>> { None }
//! }
//!
//! let mut engine = AtemConnection::new(Loopback, ManualClock::new(0), EngineConfig::default());
//! engine.connect().unwrap();
//! assert_eq!(engine.connection_state(), ConnectionState::Connecting);
//! ```

pub mod commands;
pub mod config;
pub mod connection;
pub mod domain;
pub mod error;
pub mod events;
pub mod protocol;
pub mod reliability;
pub mod transport;

/// Crate version, reported by the client's `info` command.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use commands::OutboundCommand;
pub use config::EngineConfig;
pub use connection::{AtemConnection, ConnectionInfo};
pub use domain::inputs::SourceValidator;
pub use domain::state::{ConnectionState, DeviceState};
pub use error::EngineError;
pub use events::{AtemEvent, EventHandlers, EventSink};
pub use protocol::codec::{decode_packet, ProtocolError};
pub use transport::{Clock, Transport, TransportError};
