//! Engine tuning parameters.
//!
//! All values default to what real switchers expect; a host normally only
//! overrides them from a config file (see the client's `[engine]` table).

use serde::{Deserialize, Serialize};

use crate::protocol::messages::HELLO_SESSION_ID;

/// Timing and sizing knobs for one [`AtemConnection`](crate::AtemConnection).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Silence (ms) after which a handshake or an established connection
    /// is considered dead.
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// Idle time (ms) after which a keep-alive is sent.
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    /// Number of outgoing packets retained for retransmission.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Placeholder session id used until the switcher assigns one.
    #[serde(default = "default_initial_session_id")]
    pub initial_session_id: u16,
}

fn default_connection_timeout_ms() -> u64 {
    5_000
}
fn default_heartbeat_interval_ms() -> u64 {
    500
}
fn default_history_capacity() -> usize {
    100
}
fn default_initial_session_id() -> u16 {
    HELLO_SESSION_ID
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            connection_timeout_ms: default_connection_timeout_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            history_capacity: default_history_capacity(),
            initial_session_id: default_initial_session_id(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_engine_config_matches_switcher_expectations() {
        let cfg = EngineConfig::default();

        assert_eq!(cfg.connection_timeout_ms, 5_000);
        assert_eq!(cfg.heartbeat_interval_ms, 500);
        assert_eq!(cfg.history_capacity, 100);
        assert_eq!(cfg.initial_session_id, 0x53AB);
    }
}
