//! Connection state and the device state reconstructed from broadcasts.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of one switcher connection.
///
/// ```text
/// Disconnected ──connect──▶ Connecting ──NewSessionId──▶ Connected
///                               │                          │    │
///                            timeout                   timeout  disconnect
///                               ▼                          ▼    ▼
///                             Error ◀───────────────────────┘  Disconnected
/// ```
///
/// `Error` stays put until the caller starts a fresh connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Error => "error",
        };
        f.write_str(s)
    }
}

/// The switcher's state as last reported by the switcher itself.
///
/// Only inbound broadcasts write to this; issuing a command never changes it
/// until the switcher echoes the result back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceState {
    pub program_input: u16,
    pub preview_input: u16,
    pub transition_in_progress: bool,
    /// Transition handle position, 0..=10000.
    pub transition_position: u16,
}
