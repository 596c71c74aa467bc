//! # DKG Core
//!
//! Mediates a two-party, three-round distributed key generation between P0,
//! which runs this code, and a remote counterpart P1. Every round is delegated
//! to an opaque cryptographic engine: P0 only decodes and checks the
//! counterpart's messages, enforces the order of the rounds, and relays the
//! engine's replies.
//!
//! The rounds are `init`, `commit` and `finalize`. A run which skips or repeats
//! a round is refused before the engine is reached.

/// The engine trait and the bounded way of calling it
mod engine;
pub use engine::{call_bounded, panic_message, Engine};

/// Runs rounds against the engine and keeps the state of each run
pub mod orchestrator;
pub use orchestrator::{Orchestrator, ProtocolConfig};

/// Low level primitives and datatypes for the protocol
pub mod primitives;

#[cfg(test)]
mod test_helpers;
