//! Command layer: fixed-shape outbound requests and the inbound broadcasts
//! that update [`DeviceState`](crate::domain::state::DeviceState).
//!
//! New command families follow the same pattern: add a variant to
//! [`OutboundCommand`] with its name and 4-byte payload, or a decoder arm in
//! [`inbound::decode_command`].  Neither the codec nor the reliability layer
//! needs to change.

pub mod inbound;
pub mod outbound;

pub use inbound::{apply_command, decode_command, InboundCommand, StateChange};
pub use outbound::{OutboundCommand, MAX_TRANSITION_POSITION};
