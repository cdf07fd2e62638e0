//! atem-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does atem-client do? (for beginners)
//!
//! `atem-core` is a sans-I/O protocol engine: it knows the switcher's wire
//! format but never touches a socket or the system clock.  This crate is
//! the host around it:
//!
//! 1. Loads `config.toml` (switcher address, tick rate, engine timeouts).
//! 2. Opens a UDP socket connected to the switcher on port 9910.
//! 3. Ticks the engine every few milliseconds from a Tokio interval.
//! 4. Reads operator commands from stdin (`pgm 2`, `cut`, ...) and turns
//!    them into engine calls.
//! 5. Logs connection and tally changes as the switcher reports them.

/// Application layer: console command parsing and dispatch.
pub mod application;

/// Infrastructure layer: UDP transport, clock, config file, model tables.
pub mod infrastructure;
