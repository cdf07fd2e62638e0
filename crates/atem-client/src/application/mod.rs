//! Application layer use cases for the client application.
//!
//! - **`console`** – Parses operator commands typed on stdin (`pgm 2`,
//!   `cut`, `tbar 5000`, ...) and runs them against the protocol engine.
//!   Commands are fire-and-forget: the console reports the packet id that
//!   was sent, and the resulting state change arrives later as an engine
//!   event once the switcher confirms it.

pub mod console;
