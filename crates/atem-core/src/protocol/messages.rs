//! Wire-level types and constants for the ATEM control protocol.
//!
//! Every datagram starts with a fixed 12-byte header.  All multi-byte integers
//! are big-endian:
//!
//! ```text
//! byte  0..2   [flags:5][length:11]   total packet length (header + body)
//! byte  2..4   session id
//! byte  4..6   acknowledged packet id (AckReply)
//! byte  6..8   retransmit-from packet id (RetransmitRequest)
//! byte  8..10  hello marker (only populated by the hello packet)
//! byte 10..12  sender's own packet id
//! ```
//!
//! The body, when present, is a sequence of command blocks:
//!
//! ```text
//! [block_len:2][reserved:2][name:4][payload:block_len-8]
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use super::codec::ProtocolError;

// ── Protocol constants ────────────────────────────────────────────────────────

/// UDP port the switcher listens on.
pub const ATEM_PORT: u16 = 9910;

/// Size of the packet header in bytes.
pub const HEADER_SIZE: usize = 12;

/// Largest datagram the engine will read from the transport.
pub const MAX_PACKET_SIZE: usize = 1500;

/// Largest value the 11-bit length field can carry.
pub const MAX_DECLARED_LENGTH: u16 = 0x07FF;

/// Size of the sub-header in front of every command block.
pub const COMMAND_HEADER_SIZE: usize = 8;

/// Payload bytes carried by every fixed-shape outbound command.
pub const COMMAND_PAYLOAD_SIZE: usize = 4;

/// Total size of an outbound command packet (header + one 12-byte block).
pub const COMMAND_PACKET_SIZE: usize = HEADER_SIZE + COMMAND_HEADER_SIZE + COMMAND_PAYLOAD_SIZE;

/// Size of the handshake packet.
pub const HELLO_PACKET_SIZE: usize = 20;

/// Placeholder session id used until the switcher assigns the real one.
pub const HELLO_SESSION_ID: u16 = 0x53AB;

/// Marker value carried in bytes 8..10 of the hello packet.
pub const HELLO_MARKER: u16 = 0x003A;

/// Body of the hello packet (bytes 12..20).
pub const HELLO_BODY: [u8; HELLO_PACKET_SIZE - HEADER_SIZE] = [0x01, 0, 0, 0, 0, 0, 0, 0];

// ── Flags ─────────────────────────────────────────────────────────────────────

/// The five protocol flags stored in the top bits of the first header byte.
///
/// Flags are independent and may be combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PacketFlags(pub u8);

impl PacketFlags {
    pub const ACK_REQUEST: u8 = 0x01;
    pub const NEW_SESSION_ID: u8 = 0x02;
    pub const IS_RETRANSMIT: u8 = 0x04;
    pub const RETRANSMIT_REQUEST: u8 = 0x08;
    pub const ACK_REPLY: u8 = 0x10;

    /// Mask of all bits that fit in the 5-bit flag field.
    pub const MASK: u8 = 0x1F;

    /// Returns an empty flag set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Returns a flag set containing exactly `bits` (masked to 5 bits).
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::MASK)
    }

    /// Returns a copy of this set with `flag` added.
    pub const fn with(self, flag: u8) -> Self {
        Self((self.0 | flag) & Self::MASK)
    }

    /// Returns `true` if every bit in `flag` is set.
    pub const fn contains(self, flag: u8) -> bool {
        self.0 & flag == flag
    }

    pub fn ack_request(self) -> bool {
        self.contains(Self::ACK_REQUEST)
    }

    pub fn new_session_id(self) -> bool {
        self.contains(Self::NEW_SESSION_ID)
    }

    pub fn is_retransmit(self) -> bool {
        self.contains(Self::IS_RETRANSMIT)
    }

    pub fn retransmit_request(self) -> bool {
        self.contains(Self::RETRANSMIT_REQUEST)
    }

    pub fn ack_reply(self) -> bool {
        self.contains(Self::ACK_REPLY)
    }
}

impl fmt::Display for PacketFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(u8, &str); 5] = [
            (PacketFlags::ACK_REQUEST, "AckRequest"),
            (PacketFlags::NEW_SESSION_ID, "NewSessionId"),
            (PacketFlags::IS_RETRANSMIT, "IsRetransmit"),
            (PacketFlags::RETRANSMIT_REQUEST, "RetransmitRequest"),
            (PacketFlags::ACK_REPLY, "AckReply"),
        ];
        let mut first = true;
        for (bit, name) in NAMES {
            if self.contains(bit) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        if first {
            f.write_str("none")?;
        }
        Ok(())
    }
}

// ── Header ────────────────────────────────────────────────────────────────────

/// Decoded form of the 12-byte packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketHeader {
    pub flags: PacketFlags,
    /// Declared total packet length (11 bits).
    pub length: u16,
    pub session_id: u16,
    /// Packet id being acknowledged (bytes 4..6).
    pub ack_id: u16,
    /// First packet id the sender wants replayed (bytes 6..8).
    pub retransmit_from: u16,
    /// Bytes 8..10; zero except in the hello packet.
    pub marker: u16,
    /// The sender's own sequence id for this packet (bytes 10..12).
    pub packet_id: u16,
}

impl PacketHeader {
    /// Header of the handshake packet.
    pub fn hello() -> Self {
        Self {
            flags: PacketFlags::from_bits(PacketFlags::NEW_SESSION_ID),
            length: HELLO_PACKET_SIZE as u16,
            session_id: HELLO_SESSION_ID,
            marker: HELLO_MARKER,
            ..Self::default()
        }
    }

    /// Header-only acknowledgment of `acked_id`.
    pub fn ack(session_id: u16, acked_id: u16) -> Self {
        Self {
            flags: PacketFlags::from_bits(PacketFlags::ACK_REPLY),
            length: HEADER_SIZE as u16,
            session_id,
            ack_id: acked_id,
            ..Self::default()
        }
    }

    /// Header-only reliable packet used as a keep-alive.
    pub fn heartbeat(session_id: u16, packet_id: u16) -> Self {
        Self {
            flags: PacketFlags::from_bits(PacketFlags::ACK_REQUEST),
            length: HEADER_SIZE as u16,
            session_id,
            packet_id,
            ..Self::default()
        }
    }

    /// Header of a reliable packet carrying `body_len` bytes of command blocks.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::PayloadTooLarge`] if the total length does
    /// not fit the 11-bit length field.
    pub fn reliable(
        session_id: u16,
        packet_id: u16,
        body_len: usize,
    ) -> Result<Self, ProtocolError> {
        let total = HEADER_SIZE + body_len;
        let length = u16::try_from(total)
            .ok()
            .filter(|&len| len <= MAX_DECLARED_LENGTH)
            .ok_or(ProtocolError::PayloadTooLarge { len: body_len })?;
        Ok(Self {
            flags: PacketFlags::from_bits(PacketFlags::ACK_REQUEST),
            length,
            session_id,
            packet_id,
            ..Self::default()
        })
    }

    /// Serialises the header into its 12-byte wire form.
    ///
    /// Flags are masked to 5 bits and the length to 11 bits.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let word = (u16::from(self.flags.0 & PacketFlags::MASK) << 11)
            | (self.length & MAX_DECLARED_LENGTH);
        let mut out = [0u8; HEADER_SIZE];
        out[0..2].copy_from_slice(&word.to_be_bytes());
        out[2..4].copy_from_slice(&self.session_id.to_be_bytes());
        out[4..6].copy_from_slice(&self.ack_id.to_be_bytes());
        out[6..8].copy_from_slice(&self.retransmit_from.to_be_bytes());
        out[8..10].copy_from_slice(&self.marker.to_be_bytes());
        out[10..12].copy_from_slice(&self.packet_id.to_be_bytes());
        out
    }
}

// ── Command names ─────────────────────────────────────────────────────────────

/// A four-character ASCII command tag such as `PrgI` or `CPvI`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandName(pub [u8; 4]);

impl CommandName {
    /// Program input broadcast from the switcher.
    pub const PROGRAM_INPUT: CommandName = CommandName(*b"PrgI");
    /// Preview input broadcast from the switcher.
    pub const PREVIEW_INPUT: CommandName = CommandName(*b"PrvI");
    /// Transition position broadcast from the switcher.
    pub const TRANSITION_POSITION: CommandName = CommandName(*b"TrPs");

    pub const CHANGE_PREVIEW_INPUT: CommandName = CommandName(*b"CPvI");
    pub const CHANGE_PROGRAM_INPUT: CommandName = CommandName(*b"CPgI");
    pub const CUT: CommandName = CommandName(*b"DCut");
    pub const AUTO: CommandName = CommandName(*b"DAut");
    pub const FADE_TO_BLACK_AUTO: CommandName = CommandName(*b"FtbA");
    pub const FADE_TO_BLACK_RATE: CommandName = CommandName(*b"FtbC");
    pub const SET_TRANSITION_POSITION: CommandName = CommandName(*b"CTPs");
    pub const PREVIEW_TRANSITION: CommandName = CommandName(*b"CTPr");

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommandName({self})")
    }
}

/// One decoded command block, borrowing its payload from the packet body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandBlock<'a> {
    pub name: CommandName,
    pub payload: &'a [u8],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_combine_independently() {
        let flags = PacketFlags::empty()
            .with(PacketFlags::ACK_REQUEST)
            .with(PacketFlags::RETRANSMIT_REQUEST);

        assert!(flags.ack_request());
        assert!(flags.retransmit_request());
        assert!(!flags.new_session_id());
        assert!(!flags.ack_reply());
        assert_eq!(flags.0, 0x09);
    }

    #[test]
    fn test_flags_from_bits_drops_bits_outside_field() {
        assert_eq!(PacketFlags::from_bits(0xFF).0, 0x1F);
    }

    #[test]
    fn test_flags_display_lists_set_flags() {
        let flags = PacketFlags::from_bits(PacketFlags::ACK_REQUEST | PacketFlags::ACK_REPLY);
        assert_eq!(flags.to_string(), "AckRequest|AckReply");
        assert_eq!(PacketFlags::empty().to_string(), "none");
    }

    #[test]
    fn test_hello_header_encodes_reference_bytes() {
        let bytes = PacketHeader::hello().encode();
        assert_eq!(
            bytes,
            [0x10, 0x14, 0x53, 0xAB, 0x00, 0x00, 0x00, 0x00, 0x00, 0x3A, 0x00, 0x00]
        );
    }

    #[test]
    fn test_ack_header_places_acked_id_in_bytes_4_and_5() {
        let bytes = PacketHeader::ack(0xBEEF, 0x0102).encode();
        assert_eq!(
            bytes,
            [0x80, 0x0C, 0xBE, 0xEF, 0x01, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_heartbeat_header_places_packet_id_in_last_two_bytes() {
        let bytes = PacketHeader::heartbeat(0x8001, 7).encode();
        assert_eq!(&bytes[0..2], &[0x08, 0x0C]);
        assert_eq!(&bytes[2..4], &[0x80, 0x01]);
        assert_eq!(&bytes[10..12], &[0x00, 0x07]);
    }

    #[test]
    fn test_command_name_display_escapes_non_ascii() {
        assert_eq!(CommandName::PROGRAM_INPUT.to_string(), "PrgI");
        assert_eq!(CommandName([b'A', 0x00, b'B', b'C']).to_string(), "A\\x00BC");
    }
}
