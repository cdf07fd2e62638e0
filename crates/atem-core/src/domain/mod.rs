//! Domain types for the switcher: connection state, the observed device
//! state snapshot, and input source identifiers.
//!
//! Nothing in here touches the network.  The engine owns one value of each
//! type per switcher connection and is the only writer.

/// Input source identifiers and advisory validation.
pub mod inputs;

/// Connection and device state snapshots.
pub mod state;
