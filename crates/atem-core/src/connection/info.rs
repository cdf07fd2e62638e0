//! Point-in-time diagnostics for a connection.

use std::fmt;

use serde::Serialize;

use crate::domain::{inputs, state::ConnectionState};

/// Snapshot returned by [`AtemConnection::connection_info`](crate::AtemConnection::connection_info).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConnectionInfo {
    pub state: ConnectionState,
    pub session_id: u16,
    /// Id the next reliable packet will carry.
    pub local_packet_id: u16,
    /// Highest id received from the switcher.
    pub remote_packet_id: u16,
    pub last_acked_by_device: Option<u16>,
    /// Packets currently available for retransmission.
    pub retained_packets: usize,
    pub program_input: u16,
    pub preview_input: u16,
}

impl fmt::Display for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "state:            {}", self.state)?;
        writeln!(f, "session id:       0x{:04X}", self.session_id)?;
        writeln!(f, "local packet id:  {}", self.local_packet_id)?;
        writeln!(f, "remote packet id: {}", self.remote_packet_id)?;
        match self.last_acked_by_device {
            Some(id) => writeln!(f, "last acked:       {id}")?,
            None => writeln!(f, "last acked:       -")?,
        }
        writeln!(f, "retained packets: {}", self.retained_packets)?;
        writeln!(
            f,
            "program:          {} ({})",
            self.program_input,
            inputs::label(self.program_input)
        )?;
        write!(
            f,
            "preview:          {} ({})",
            self.preview_input,
            inputs::label(self.preview_input)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formats_session_as_hex() {
        let info = ConnectionInfo {
            state: ConnectionState::Connected,
            session_id: 0xBEEF,
            local_packet_id: 3,
            remote_packet_id: 9,
            last_acked_by_device: None,
            retained_packets: 2,
            program_input: 1,
            preview_input: 2,
        };

        let text = info.to_string();

        assert!(text.contains("0xBEEF"));
        assert!(text.contains("state:            connected"));
        assert!(text.contains("last acked:       -"));
    }
}
