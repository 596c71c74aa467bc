use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire types exchanged with the counterpart and their invariants
pub mod types;
pub use types::*;

/// JSON encoding and decoding of the wire types
pub mod codec;

/// Checks the codec cannot express on its own
pub mod validate;

/// The per-round state machine of a run
pub(crate) mod phases;
pub use phases::*;
pub(crate) use phases::RunState;

mod errors;
pub use errors::{
    ArityError, BridgeFault, DecodeError, EngineError, ErrorKind, Fault, ProtocolError,
    ProtocolResult, ValidationError,
};

/// The three rounds of the protocol, in the order they must run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Round {
    Init,
    Commit,
    Finalize,
}

impl Round {
    pub fn as_str(&self) -> &'static str {
        match self {
            Round::Init => "init",
            Round::Commit => "commit",
            Round::Finalize => "finalize",
        }
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
