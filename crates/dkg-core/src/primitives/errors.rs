use super::{phases::Stage, types::RunId, Round};
use serde_json::error::Category;
use std::{fmt, time::Duration};
use thiserror::Error;

/// Result type alias which returns `ProtocolError`
pub type ProtocolResult<A> = Result<A, ProtocolError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Raised when a `Part`'s coefficients do not match its degree
pub enum ArityError {
    #[error("part of degree {degree} must have {} coefficients, got {got}", .degree + 1)]
    CoefficientCount { degree: usize, got: usize },

    #[error("part degree {0} is out of range")]
    DegreeOverflow(usize),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Errors raised by the codec when a message does not match its schema
pub enum DecodeError {
    /// The payload is not JSON at all
    #[error("malformed json: {0}")]
    Syntax(String),

    /// The payload is JSON but a field is missing, has the wrong type, a
    /// byte is out of range or a part has the wrong arity
    #[error("invalid message: {0}")]
    Shape(String),

    /// The payload ended early
    #[error("truncated message: {0}")]
    Truncated(String),
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        match err.classify() {
            Category::Syntax | Category::Io => DecodeError::Syntax(err.to_string()),
            Category::Data => DecodeError::Shape(err.to_string()),
            Category::Eof => DecodeError::Truncated(err.to_string()),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Structural checks which the codec alone cannot express
pub enum ValidationError {
    #[error("{field} must be {expected} bytes, got {got}")]
    PublicKeyLength {
        field: &'static str,
        expected: usize,
        got: usize,
    },

    #[error(transparent)]
    Arity(#[from] ArityError),

    #[error("{field} coefficient {index} is empty")]
    EmptyCoefficient { field: &'static str, index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A failure reported by the cryptographic engine itself through the
/// reserved `error` field of its response
pub struct EngineError {
    pub code: Option<String>,
    pub message: String,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "[{}] {}", code, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for EngineError {}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Failures of the foreign call itself, as opposed to failures the engine
/// reports. These are never retried.
pub enum BridgeFault {
    #[error("request could not be encoded: {0}")]
    Encode(String),

    #[error("request contains a NUL byte at offset {0}")]
    InteriorNul(usize),

    #[error("could not allocate the request buffer")]
    AllocationFailed,

    #[error("engine returned a null response")]
    NullResponse,

    #[error("engine returned an empty response")]
    EmptyResponse,

    #[error("engine response is not valid utf-8: {0}")]
    InvalidUtf8(String),

    #[error("engine response is not json: {0}")]
    MalformedResponse(String),

    #[error("native call panicked: {0}")]
    Panicked(String),

    #[error("native call did not return within {0:?}")]
    Timeout(Duration),

    #[error("native call was cancelled")]
    Cancelled,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Anything that prevented the engine bridge from producing a success payload
pub enum Fault {
    #[error("engine fault: {0}")]
    Engine(#[from] EngineError),

    #[error("bridge fault: {0}")]
    Bridge(#[from] BridgeFault),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Errors which may occur while running a round of the protocol. All of them
/// end the current round.
pub enum ProtocolError {
    /// The request could not be decoded
    #[error("invalid input: {0}")]
    Decode(#[from] DecodeError),

    /// The request decoded but is not well formed
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// The round was called out of order, or on an unknown run
    #[error("{round} is not allowed on run {run_id} in stage {stage}")]
    Sequence {
        run_id: RunId,
        round: Round,
        stage: Stage,
    },

    /// The engine or the bridge to it failed
    #[error("{round} failed: {fault}")]
    EngineFailure { round: Round, fault: Fault },

    /// The engine answered with something the protocol does not recognize
    #[error("{round} engine reply violates the protocol: {detail}")]
    ProtocolInvariantViolation { round: Round, detail: String },

    /// P0 already holds as many runs as it is configured to
    #[error("cannot start a new run, {limit} runs are already in progress")]
    Capacity { limit: usize },
}

/// Stable machine-readable error kinds surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    SequenceError,
    EngineFault,
    BridgeFault,
    ProtocolInvariantViolation,
    Overloaded,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::SequenceError => "sequence_error",
            ErrorKind::EngineFault => "engine_fault",
            ErrorKind::BridgeFault => "bridge_fault",
            ErrorKind::ProtocolInvariantViolation => "protocol_invariant_violation",
            ErrorKind::Overloaded => "overloaded",
        }
    }
}

impl ProtocolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProtocolError::Decode(_) | ProtocolError::Validation(_) => ErrorKind::InvalidInput,
            ProtocolError::Sequence { .. } => ErrorKind::SequenceError,
            ProtocolError::EngineFailure {
                fault: Fault::Engine(_),
                ..
            } => ErrorKind::EngineFault,
            ProtocolError::EngineFailure {
                fault: Fault::Bridge(_),
                ..
            } => ErrorKind::BridgeFault,
            ProtocolError::ProtocolInvariantViolation { .. } => {
                ErrorKind::ProtocolInvariantViolation
            }
            ProtocolError::Capacity { .. } => ErrorKind::Overloaded,
        }
    }

    /// The round in which the engine was involved in the failure, if it was.
    /// The engine's state for the run is then unknown and the run cannot
    /// continue.
    pub fn engine_round(&self) -> Option<Round> {
        match self {
            ProtocolError::EngineFailure { round, .. }
            | ProtocolError::ProtocolInvariantViolation { round, .. } => Some(*round),
            _ => None,
        }
    }
}
