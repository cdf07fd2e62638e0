//! Binary codec for ATEM packets and the command blocks they carry.
//!
//! Decoding is deliberately forgiving where the switcher is authoritative
//! (a declared length that disagrees with the datagram size is only a
//! warning) and strict where a mistake would mean reading out of bounds
//! (short headers, command blocks that overrun the body).

use thiserror::Error;
use tracing::{trace, warn};

use crate::protocol::messages::{
    CommandBlock, CommandName, PacketFlags, PacketHeader, COMMAND_HEADER_SIZE,
    COMMAND_PACKET_SIZE, COMMAND_PAYLOAD_SIZE, HEADER_SIZE, HELLO_BODY, HELLO_PACKET_SIZE,
    MAX_DECLARED_LENGTH,
};

/// Errors that can occur while encoding or decoding packets.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The byte slice is shorter than the minimum required length.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// A command block inside a packet body is malformed.
    #[error("malformed command block at body offset {offset}: {reason}")]
    MalformedCommandBlock { offset: usize, reason: String },

    /// The body would not fit in the 11-bit length field.
    #[error("payload too large: {len} bytes does not fit the 11-bit length field")]
    PayloadTooLarge { len: usize },
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// A decoded datagram: its header plus a borrowed view of the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedPacket<'a> {
    pub header: PacketHeader,
    /// Command-block bytes following the header.
    pub body: &'a [u8],
    /// Number of bytes actually received.
    pub received_len: usize,
}

impl<'a> DecodedPacket<'a> {
    /// Returns `true` when the header's length field disagrees with the
    /// number of bytes actually received.
    pub fn has_length_mismatch(&self) -> bool {
        usize::from(self.header.length) != self.received_len
    }

    /// Returns `true` when the packet carries at least one body byte.
    pub fn has_body(&self) -> bool {
        !self.body.is_empty()
    }

    /// Iterates the command blocks in the body.
    pub fn commands(&self) -> CommandBlocks<'a> {
        CommandBlocks::new(self.body)
    }
}

/// Decodes the fixed 12-byte header at the start of `bytes`.
///
/// # Errors
///
/// Returns [`ProtocolError::InsufficientData`] when fewer than 12 bytes are
/// available.
pub fn decode_header(bytes: &[u8]) -> Result<PacketHeader, ProtocolError> {
    if bytes.len() < HEADER_SIZE {
        return Err(ProtocolError::InsufficientData {
            needed: HEADER_SIZE,
            available: bytes.len(),
        });
    }

    let word = u16::from_be_bytes([bytes[0], bytes[1]]);
    Ok(PacketHeader {
        flags: PacketFlags::from_bits((word >> 11) as u8),
        length: word & MAX_DECLARED_LENGTH,
        session_id: u16::from_be_bytes([bytes[2], bytes[3]]),
        ack_id: u16::from_be_bytes([bytes[4], bytes[5]]),
        retransmit_from: u16::from_be_bytes([bytes[6], bytes[7]]),
        marker: u16::from_be_bytes([bytes[8], bytes[9]]),
        packet_id: u16::from_be_bytes([bytes[10], bytes[11]]),
    })
}

/// Decodes a whole datagram.
///
/// The body ends at the declared length when that is shorter than the
/// datagram (and at least a header long); otherwise at the end of the
/// datagram.  A mismatch between the two is logged, not rejected.
///
/// # Errors
///
/// Returns [`ProtocolError::InsufficientData`] for datagrams shorter than the
/// header.
///
/// # Examples
///
/// ```rust
/// use atem_core::protocol::codec::decode_packet;
///
/// let bytes = [0x80, 0x0C, 0xBE, 0xEF, 0x00, 0x05, 0, 0, 0, 0, 0, 0];
/// let packet = decode_packet(&bytes).unwrap();
/// assert!(packet.header.flags.ack_reply());
/// assert_eq!(packet.header.ack_id, 5);
/// assert!(!packet.has_body());
/// ```
pub fn decode_packet(bytes: &[u8]) -> Result<DecodedPacket<'_>, ProtocolError> {
    let header = decode_header(bytes)?;

    let declared = usize::from(header.length);
    let end = if declared >= HEADER_SIZE && declared < bytes.len() {
        declared
    } else {
        bytes.len()
    };

    let packet = DecodedPacket {
        header,
        body: &bytes[HEADER_SIZE..end],
        received_len: bytes.len(),
    };

    if packet.has_length_mismatch() {
        warn!(
            declared,
            received = bytes.len(),
            "packet length mismatch; processing anyway"
        );
    }
    Ok(packet)
}

/// Iterator over the command blocks in a packet body.
///
/// Yields `Ok` for every well-formed block.  The first malformed block
/// yields one `Err` and ends the iteration, so blocks consumed before it are
/// unaffected.  Fewer than eight trailing bytes are treated as padding and
/// end the iteration silently.
#[derive(Debug, Clone)]
pub struct CommandBlocks<'a> {
    body: &'a [u8],
    offset: usize,
    done: bool,
}

impl<'a> CommandBlocks<'a> {
    pub fn new(body: &'a [u8]) -> Self {
        Self {
            body,
            offset: 0,
            done: false,
        }
    }

    fn fail(&mut self, reason: String) -> Option<Result<CommandBlock<'a>, ProtocolError>> {
        self.done = true;
        Some(Err(ProtocolError::MalformedCommandBlock {
            offset: self.offset,
            reason,
        }))
    }
}

impl<'a> Iterator for CommandBlocks<'a> {
    type Item = Result<CommandBlock<'a>, ProtocolError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let remaining = &self.body[self.offset..];
        if remaining.len() < COMMAND_HEADER_SIZE {
            if !remaining.is_empty() {
                trace!(bytes = remaining.len(), "ignoring trailing body bytes");
            }
            self.done = true;
            return None;
        }

        let block_len = usize::from(u16::from_be_bytes([remaining[0], remaining[1]]));
        if block_len < COMMAND_HEADER_SIZE {
            return self.fail(format!(
                "declared length {block_len} is shorter than the {COMMAND_HEADER_SIZE}-byte block header"
            ));
        }
        if block_len > remaining.len() {
            return self.fail(format!(
                "declared length {block_len} exceeds the {} bytes left in the body",
                remaining.len()
            ));
        }

        let mut name = [0u8; 4];
        name.copy_from_slice(&remaining[4..8]);
        let block = CommandBlock {
            name: CommandName(name),
            payload: &remaining[COMMAND_HEADER_SIZE..block_len],
        };
        self.offset += block_len;
        Some(Ok(block))
    }
}

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Appends one command block (sub-header + name + payload) to `buf`.
///
/// # Errors
///
/// Returns [`ProtocolError::PayloadTooLarge`] if the block length does not
/// fit in 16 bits.
pub fn encode_command_block(
    buf: &mut Vec<u8>,
    name: CommandName,
    payload: &[u8],
) -> Result<(), ProtocolError> {
    let block_len = COMMAND_HEADER_SIZE + payload.len();
    let len = u16::try_from(block_len).map_err(|_| ProtocolError::PayloadTooLarge { len: block_len })?;
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(&[0x00, 0x00]); // reserved
    buf.extend_from_slice(name.as_bytes());
    buf.extend_from_slice(payload);
    Ok(())
}

/// Serialises a header followed by `body`.
///
/// The header's length field is overwritten with the real packet size.
///
/// # Errors
///
/// Returns [`ProtocolError::PayloadTooLarge`] if the packet would not fit the
/// 11-bit length field.
pub fn encode_packet(header: &PacketHeader, body: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let total = HEADER_SIZE + body.len();
    if total > usize::from(MAX_DECLARED_LENGTH) {
        return Err(ProtocolError::PayloadTooLarge { len: body.len() });
    }
    let header = PacketHeader {
        length: total as u16,
        ..*header
    };
    let mut buf = Vec::with_capacity(total);
    buf.extend_from_slice(&header.encode());
    buf.extend_from_slice(body);
    Ok(buf)
}

/// Builds the 20-byte handshake packet.
pub fn build_hello_packet() -> Vec<u8> {
    let mut buf = Vec::with_capacity(HELLO_PACKET_SIZE);
    buf.extend_from_slice(&PacketHeader::hello().encode());
    buf.extend_from_slice(&HELLO_BODY);
    buf
}

/// Builds a 12-byte acknowledgment of `acked_id`.
pub fn build_ack_packet(session_id: u16, acked_id: u16) -> Vec<u8> {
    PacketHeader::ack(session_id, acked_id).encode().to_vec()
}

/// Builds a 12-byte heartbeat carrying `packet_id`.
pub fn build_heartbeat_packet(session_id: u16, packet_id: u16) -> Vec<u8> {
    PacketHeader::heartbeat(session_id, packet_id).encode().to_vec()
}

/// Builds a 24-byte reliable packet carrying a single fixed-shape command.
///
/// # Examples
///
/// ```rust
/// use atem_core::protocol::codec::build_command_packet;
/// use atem_core::protocol::messages::CommandName;
///
/// let bytes = build_command_packet(0x8001, 3, CommandName::CHANGE_PREVIEW_INPUT, [0, 0, 0, 2]);
/// assert_eq!(bytes.len(), 24);
/// assert_eq!(&bytes[16..20], b"CPvI");
/// assert_eq!(&bytes[20..24], &[0, 0, 0, 2]);
/// ```
pub fn build_command_packet(
    session_id: u16,
    packet_id: u16,
    name: CommandName,
    payload: [u8; COMMAND_PAYLOAD_SIZE],
) -> Vec<u8> {
    let header = PacketHeader {
        flags: PacketFlags::from_bits(PacketFlags::ACK_REQUEST),
        length: COMMAND_PACKET_SIZE as u16,
        session_id,
        packet_id,
        ..PacketHeader::default()
    };
    let mut buf = Vec::with_capacity(COMMAND_PACKET_SIZE);
    buf.extend_from_slice(&header.encode());
    buf.extend_from_slice(&((COMMAND_HEADER_SIZE + COMMAND_PAYLOAD_SIZE) as u16).to_be_bytes());
    buf.extend_from_slice(&[0x00, 0x00]);
    buf.extend_from_slice(name.as_bytes());
    buf.extend_from_slice(&payload);
    buf
}

/// Formats bytes as a contiguous lowercase hex string for trace logging.
pub fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
