use super::{
    types::{Acknowledgment, Part, PublicKey, RunId, SignatureShare},
    validate, Round, ValidationError,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;

/// RoundPhase abstracts one step of the run as seen from P0. Each phase knows
/// which engine entry point it drives, how to build the engine request from
/// the run state accumulated so far plus the counterpart's input, and how to
/// fold the engine's reply into the next phase.
pub trait RoundPhase: Clone + fmt::Debug + Send + 'static {
    /// The round this phase runs
    const ROUND: Round;

    /// The counterpart's contribution for this round, already validated
    type Input: Send;
    /// What is handed to the engine
    type Call: Serialize;
    /// What the engine must answer
    type Reply: EngineReply;
    /// The phase reached once the engine answered
    type Next;

    fn call(&self, run_id: RunId, input: &Self::Input) -> Self::Call;

    fn advance(self, input: Self::Input, reply: Self::Reply) -> Self::Next;
}

/// A reply decoded from the engine. Replies are checked against the same
/// invariants as the counterpart's messages.
pub trait EngineReply: DeserializeOwned {
    fn validate(&self, public_key_len: usize) -> Result<(), ValidationError>;
}

/// Where a run is in the protocol
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Initialized,
    Committed,
    Finalized,
    /// The engine failed during a round and its state for the run is unknown
    Aborted,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Idle => "idle",
            Stage::Initialized => "initialized",
            Stage::Committed => "committed",
            Stage::Finalized => "finalized",
            Stage::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// The state of one run, held by P0 between rounds
#[derive(Clone, Debug)]
pub(crate) enum RunState {
    Idle(Idle),
    Initialized(Initialized),
    Committed(Committed),
    Finalized(Finalized),
    Aborted,
}

impl RunState {
    pub(crate) fn stage(&self) -> Stage {
        match self {
            RunState::Idle(_) => Stage::Idle,
            RunState::Initialized(_) => Stage::Initialized,
            RunState::Committed(_) => Stage::Committed,
            RunState::Finalized(_) => Stage::Finalized,
            RunState::Aborted => Stage::Aborted,
        }
    }
}

///////////////////////////////////////////////////////////////////////////
// Idle -> Initialized
///////////////////////////////////////////////////////////////////////////

/// A run which has been registered but for which the engine has not produced
/// P0's key and part yet
#[derive(Clone, Debug, Default)]
pub struct Idle;

#[derive(Debug, Serialize)]
pub struct InitCall {
    pub run_id: RunId,
    pub p1_pk: PublicKey,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InitReply {
    pub p0_pk: PublicKey,
    pub p0_part: Part,
}

impl EngineReply for InitReply {
    fn validate(&self, public_key_len: usize) -> Result<(), ValidationError> {
        validate::public_key("p0_pk", &self.p0_pk, public_key_len)?;
        validate::part("p0_part", &self.p0_part)
    }
}

/// P0 has created its key and part, and waits for P1's part
#[derive(Clone, Debug)]
pub struct Initialized {
    pub p1_pk: PublicKey,
    pub p0_pk: PublicKey,
    pub p0_part: Part,
}

impl RoundPhase for Idle {
    const ROUND: Round = Round::Init;

    type Input = PublicKey;
    type Call = InitCall;
    type Reply = InitReply;
    type Next = Initialized;

    fn call(&self, run_id: RunId, p1_pk: &PublicKey) -> InitCall {
        InitCall {
            run_id,
            p1_pk: p1_pk.clone(),
        }
    }

    fn advance(self, p1_pk: PublicKey, reply: InitReply) -> Initialized {
        Initialized {
            p1_pk,
            p0_pk: reply.p0_pk,
            p0_part: reply.p0_part,
        }
    }
}

///////////////////////////////////////////////////////////////////////////
// Initialized -> Committed
///////////////////////////////////////////////////////////////////////////

/// P1's second round message
#[derive(Clone, Debug)]
pub struct CommitInput {
    pub p1_part: Part,
    pub p1_acks: Acknowledgment,
}

#[derive(Debug, Serialize)]
pub struct CommitCall {
    pub run_id: RunId,
    pub p1_pk: PublicKey,
    pub p0_pk: PublicKey,
    pub p0_part: Part,
    pub p1_part: Part,
    pub p1_acks: Acknowledgment,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommitReply {
    pub p0_acks: Acknowledgment,
}

impl EngineReply for CommitReply {
    fn validate(&self, _: usize) -> Result<(), ValidationError> {
        // acknowledgments are opaque
        Ok(())
    }
}

/// Both parts have been exchanged and acknowledged
#[derive(Clone, Debug)]
pub struct Committed {
    pub p1_pk: PublicKey,
    pub p0_pk: PublicKey,
    pub p0_part: Part,
    pub p1_part: Part,
    pub p0_acks: Acknowledgment,
    pub p1_acks: Acknowledgment,
}

impl RoundPhase for Initialized {
    const ROUND: Round = Round::Commit;

    type Input = CommitInput;
    type Call = CommitCall;
    type Reply = CommitReply;
    type Next = Committed;

    fn call(&self, run_id: RunId, input: &CommitInput) -> CommitCall {
        CommitCall {
            run_id,
            p1_pk: self.p1_pk.clone(),
            p0_pk: self.p0_pk.clone(),
            p0_part: self.p0_part.clone(),
            p1_part: input.p1_part.clone(),
            p1_acks: input.p1_acks.clone(),
        }
    }

    fn advance(self, input: CommitInput, reply: CommitReply) -> Committed {
        Committed {
            p1_pk: self.p1_pk,
            p0_pk: self.p0_pk,
            p0_part: self.p0_part,
            p1_part: input.p1_part,
            p0_acks: reply.p0_acks,
            p1_acks: input.p1_acks,
        }
    }
}

///////////////////////////////////////////////////////////////////////////
// Committed -> Finalized
///////////////////////////////////////////////////////////////////////////

/// P1's proof that it holds a working share
#[derive(Clone, Debug)]
pub struct FinalizeInput {
    pub sig_share_1: SignatureShare,
    pub signed_msg_1: String,
}

#[derive(Debug, Serialize)]
pub struct FinalizeCall {
    pub run_id: RunId,
    pub p1_pk: PublicKey,
    pub p0_pk: PublicKey,
    pub p0_part: Part,
    pub p1_part: Part,
    pub p0_acks: Acknowledgment,
    pub p1_acks: Acknowledgment,
    pub sig_share_1: SignatureShare,
    pub signed_msg_1: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FinalizeReply {
    pub is_success: bool,
    #[serde(default)]
    pub public_key: Option<PublicKey>,
}

impl EngineReply for FinalizeReply {
    fn validate(&self, _: usize) -> Result<(), ValidationError> {
        // the group key is curve-dependent and may differ from the party keys
        match &self.public_key {
            Some(pk) if pk.is_empty() => Err(ValidationError::PublicKeyLength {
                field: "public_key",
                expected: 1,
                got: 0,
            }),
            _ => Ok(()),
        }
    }
}

/// The run is over. `is_success` tells whether P1's signature share verified.
#[derive(Clone, Debug)]
pub struct Finalized {
    pub is_success: bool,
    pub public_key: Option<PublicKey>,
}

impl RoundPhase for Committed {
    const ROUND: Round = Round::Finalize;

    type Input = FinalizeInput;
    type Call = FinalizeCall;
    type Reply = FinalizeReply;
    type Next = Finalized;

    fn call(&self, run_id: RunId, input: &FinalizeInput) -> FinalizeCall {
        FinalizeCall {
            run_id,
            p1_pk: self.p1_pk.clone(),
            p0_pk: self.p0_pk.clone(),
            p0_part: self.p0_part.clone(),
            p1_part: self.p1_part.clone(),
            p0_acks: self.p0_acks.clone(),
            p1_acks: self.p1_acks.clone(),
            sig_share_1: input.sig_share_1.clone(),
            signed_msg_1: input.signed_msg_1.clone(),
        }
    }

    fn advance(self, _: FinalizeInput, reply: FinalizeReply) -> Finalized {
        Finalized {
            is_success: reply.is_success,
            public_key: reply.public_key,
        }
    }
}
