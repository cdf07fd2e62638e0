//! Protocol module containing wire types, the packet codec, and packet id
//! sequencing.

pub mod codec;
pub mod messages;
pub mod sequence;

pub use codec::{decode_header, decode_packet, CommandBlocks, DecodedPacket, ProtocolError};
pub use messages::*;
pub use sequence::SequenceCounter;
