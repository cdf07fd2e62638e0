//! Infrastructure layer for the client application.
//!
//! Contains OS-facing adapters the protocol engine is wired to.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `atem_core`, but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`network`** – `UdpTransport` (the engine's [`Transport`]) and
//!   `SystemClock` (the engine's [`Clock`]).
//!
//! - **`models`** – Per-model input tables used for advisory source
//!   validation.
//!
//! - **`storage`** – TOML configuration file loading and saving.
//!
//! [`Transport`]: atem_core::Transport
//! [`Clock`]: atem_core::Clock

pub mod models;
pub mod network;
pub mod storage;
