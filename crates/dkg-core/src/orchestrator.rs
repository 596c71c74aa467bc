use super::{
    engine::{self, Engine},
    primitives::{
        codec, validate, BridgeFault, CommitInput, CommitRequest, CommitResponse, Committed,
        EngineReply, FinalizeInput, FinalizeRequest, FinalizeResponse, Idle, InitRequest,
        InitResponse, Initialized, ProtocolError, ProtocolResult, Round, RoundPhase, RunId,
        RunState, Stage,
    },
};

use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, RwLock},
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

/// Knobs of the protocol orchestrator
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProtocolConfig {
    /// How long a single engine call may take before the round fails
    pub engine_timeout_secs: u64,
    /// Length in bytes of the public keys the engine produces and expects
    pub public_key_len: usize,
    /// How long a run is kept after it was created
    pub run_ttl_secs: u64,
    /// Most runs held at once. New runs are refused beyond it.
    pub max_runs: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            engine_timeout_secs: 10,
            public_key_len: 48,
            run_ttl_secs: 600,
            max_runs: 10_000,
        }
    }
}

impl ProtocolConfig {
    pub fn engine_timeout(&self) -> Duration {
        Duration::from_secs(self.engine_timeout_secs)
    }

    pub fn run_ttl(&self) -> Duration {
        Duration::from_secs(self.run_ttl_secs)
    }
}

/// A run held by P0. The state lock has a single writer at a time, so two
/// rounds of the same run never reach the engine concurrently.
struct Run {
    created: Instant,
    state: Arc<Mutex<RunState>>,
}

impl Run {
    fn new() -> Self {
        Self {
            created: Instant::now(),
            state: Arc::new(Mutex::new(RunState::Idle(Idle))),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.created.elapsed() >= ttl
    }
}

/// What a round needs besides the run itself. Cloned into the task that
/// drives the round.
#[derive(Clone)]
struct Driver {
    engine: Arc<dyn Engine>,
    config: ProtocolConfig,
}

/// Drives runs through init, commit and finalize on behalf of P0.
///
/// The registry lock is only held to look up or insert a run, never across an
/// engine call, so runs progress independently of each other.
///
/// Once a round has passed validation it runs to completion on its own task.
/// Dropping the returned future, e.g. when the request times out or the
/// client goes away, does not stop it: the engine is called once and the run
/// still records the outcome.
pub struct Orchestrator {
    driver: Driver,
    runs: RwLock<HashMap<RunId, Arc<Run>>>,
}

impl Orchestrator {
    pub fn new(engine: Arc<dyn Engine>, config: ProtocolConfig) -> Self {
        Self {
            driver: Driver { engine, config },
            runs: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.driver.config
    }

    /// Decodes and runs the first round
    pub async fn handle_init(&self, body: &[u8]) -> ProtocolResult<InitResponse> {
        self.init(codec::decode(body)?).await
    }

    /// Decodes and runs the second round
    pub async fn handle_commit(&self, body: &[u8]) -> ProtocolResult<CommitResponse> {
        self.commit(codec::decode(body)?).await
    }

    /// Decodes and runs the third round
    pub async fn handle_finalize(&self, body: &[u8]) -> ProtocolResult<FinalizeResponse> {
        self.finalize(codec::decode(body)?).await
    }

    /// Registers a run and has the engine create P0's key and part
    pub async fn init(&self, req: InitRequest) -> ProtocolResult<InitResponse> {
        validate::public_key("p1_pk", &req.p1_pk, self.config().public_key_len)?;

        let run_id = req.run_id.unwrap_or_default();
        let run = self.register(run_id)?;
        let driver = self.driver.clone();

        detach(Round::Init, async move {
            let mut state = run.state.clone().lock_owned().await;
            let phase = match &*state {
                RunState::Idle(idle) => idle.clone(),
                other => return Err(sequence::<Idle>(run_id, other.stage())),
            };

            tracing::debug!(%run_id, p1_pk = %req.p1_pk.fingerprint(), "running init");
            let next = step(&mut *state, driver.run_round(run_id, phase, req.p1_pk)).await?;

            tracing::info!(%run_id, p0_pk = %next.p0_pk.fingerprint(), degree = next.p0_part.degree(), "run initialized");
            let resp = InitResponse {
                run_id,
                p0_pk: next.p0_pk.clone(),
                p0_part: next.p0_part.clone(),
            };
            *state = RunState::Initialized(next);

            Ok(resp)
        })
        .await
    }

    /// Hands P1's part and acknowledgments to the engine and returns P0's
    /// acknowledgments
    pub async fn commit(&self, req: CommitRequest) -> ProtocolResult<CommitResponse> {
        validate::part("p1_part", &req.p1_part)?;

        let run_id = req.run_id;
        let run = self.lookup::<Initialized>(run_id)?;
        let driver = self.driver.clone();

        detach(Round::Commit, async move {
            let mut state = run.state.clone().lock_owned().await;
            let phase = match &*state {
                RunState::Initialized(phase) => phase.clone(),
                other => return Err(sequence::<Initialized>(run_id, other.stage())),
            };

            let input = CommitInput {
                p1_part: req.p1_part,
                p1_acks: req.p1_acks,
            };
            tracing::debug!(%run_id, degree = input.p1_part.degree(), acks = input.p1_acks.len(), "running commit");
            let next = step(&mut *state, driver.run_round(run_id, phase, input)).await?;

            tracing::info!(%run_id, acks = next.p0_acks.len(), "run committed");
            let resp = CommitResponse {
                run_id,
                p0_acks: next.p0_acks.clone(),
            };
            *state = RunState::Committed(next);

            Ok(resp)
        })
        .await
    }

    /// Completes the run by having the engine check P1's signature share
    pub async fn finalize(&self, req: FinalizeRequest) -> ProtocolResult<FinalizeResponse> {
        let run_id = req.run_id;
        let run = self.lookup::<Committed>(run_id)?;
        let driver = self.driver.clone();

        detach(Round::Finalize, async move {
            let mut state = run.state.clone().lock_owned().await;
            let phase = match &*state {
                RunState::Committed(phase) => phase.clone(),
                other => return Err(sequence::<Committed>(run_id, other.stage())),
            };

            let input = FinalizeInput {
                sig_share_1: req.sig_share_1,
                signed_msg_1: req.signed_msg_1,
            };
            let next = step(&mut *state, driver.run_round(run_id, phase, input)).await?;

            if next.is_success {
                tracing::info!(%run_id, "run finalized");
            } else {
                tracing::warn!(%run_id, "run finalized but the signature share did not verify");
            }
            let resp = FinalizeResponse {
                run_id,
                is_success: next.is_success,
                public_key: next.public_key.clone(),
            };
            *state = RunState::Finalized(next);

            Ok(resp)
        })
        .await
    }

    /// Returns the stage of a run, if P0 knows about it
    pub async fn stage(&self, run_id: RunId) -> Option<Stage> {
        let run = self.get(run_id)?;
        let state = run.state.lock().await;
        Some(state.stage())
    }

    /// Number of runs currently held, expired ones included until pruned
    pub fn run_count(&self) -> usize {
        self.runs.read().map(|runs| runs.len()).unwrap_or(0)
    }

    /// Drops runs older than the configured time to live
    pub fn prune_expired(&self) -> usize {
        let ttl = self.config().run_ttl();
        let mut runs = match self.runs.write() {
            Ok(runs) => runs,
            Err(poisoned) => poisoned.into_inner(),
        };
        prune(&mut runs, ttl)
    }

    // Returns the run with this id, creating it if it is unknown or expired.
    // Expired runs are only swept when the registry is full.
    fn register(&self, run_id: RunId) -> ProtocolResult<Arc<Run>> {
        let config = self.config();
        let ttl = config.run_ttl();
        let mut runs = match self.runs.write() {
            Ok(runs) => runs,
            Err(poisoned) => poisoned.into_inner(),
        };

        match runs.get(&run_id).map(|run| (run.clone(), run.is_expired(ttl))) {
            Some((run, false)) => return Ok(run),
            // an expired run is replaced in place
            Some((_, true)) => {}
            None => {
                if runs.len() >= config.max_runs && prune(&mut runs, ttl) == 0 {
                    tracing::warn!(%run_id, limit = config.max_runs, "too many runs");
                    return Err(ProtocolError::Capacity {
                        limit: config.max_runs,
                    });
                }
            }
        }

        let run = Arc::new(Run::new());
        runs.insert(run_id, run.clone());
        Ok(run)
    }

    // Expired runs are invisible even before they are swept
    fn get(&self, run_id: RunId) -> Option<Arc<Run>> {
        let ttl = self.config().run_ttl();
        let runs = match self.runs.read() {
            Ok(runs) => runs,
            Err(poisoned) => poisoned.into_inner(),
        };
        runs.get(&run_id)
            .filter(|run| !run.is_expired(ttl))
            .cloned()
    }

    // An unknown run has not been initialized, so it is reported as idle
    fn lookup<P: RoundPhase>(&self, run_id: RunId) -> ProtocolResult<Arc<Run>> {
        self.get(run_id)
            .ok_or_else(|| sequence::<P>(run_id, Stage::Idle))
    }
}

impl Driver {
    // Encodes the engine request for a phase, runs it, and decodes and checks
    // the reply
    async fn run_round<P: RoundPhase>(
        &self,
        run_id: RunId,
        phase: P,
        input: P::Input,
    ) -> ProtocolResult<P::Next> {
        let request = codec::encode(&phase.call(run_id, &input)).map_err(|err| {
            ProtocolError::EngineFailure {
                round: P::ROUND,
                fault: BridgeFault::Encode(err.to_string()).into(),
            }
        })?;

        let raw = engine::call_bounded(
            self.engine.clone(),
            P::ROUND,
            request,
            self.config.engine_timeout(),
        )
        .await
        .map_err(|fault| ProtocolError::EngineFailure {
            round: P::ROUND,
            fault,
        })?;

        let reply: P::Reply =
            codec::decode_str(&raw).map_err(|err| ProtocolError::ProtocolInvariantViolation {
                round: P::ROUND,
                detail: err.to_string(),
            })?;
        reply
            .validate(self.config.public_key_len)
            .map_err(|err| ProtocolError::ProtocolInvariantViolation {
                round: P::ROUND,
                detail: err.to_string(),
            })?;

        Ok(phase.advance(input, reply))
    }
}

fn prune(runs: &mut HashMap<RunId, Arc<Run>>, ttl: Duration) -> usize {
    let before = runs.len();
    runs.retain(|_, run| !run.is_expired(ttl));
    let pruned = before - runs.len();
    if pruned > 0 {
        tracing::debug!(pruned, "dropped expired runs");
    }
    pruned
}

// Runs a round on its own task so that it completes even if the caller stops
// waiting for it
async fn detach<T, F>(round: Round, task: F) -> ProtocolResult<T>
where
    T: Send + 'static,
    F: Future<Output = ProtocolResult<T>> + Send + 'static,
{
    match tokio::spawn(task).await {
        Ok(res) => res,
        Err(err) => {
            let fault = if err.is_panic() {
                BridgeFault::Panicked(engine::panic_message(err.into_panic().as_ref()))
            } else {
                BridgeFault::Cancelled
            };
            tracing::error!(%round, %fault, "round task failed");
            Err(ProtocolError::EngineFailure {
                round,
                fault: fault.into(),
            })
        }
    }
}

// Awaits a round and aborts the run if the engine was involved in the failure
async fn step<T>(
    state: &mut RunState,
    round: impl Future<Output = ProtocolResult<T>>,
) -> ProtocolResult<T> {
    match round.await {
        Ok(next) => Ok(next),
        Err(err) => {
            match err.engine_round() {
                Some(round) => {
                    tracing::error!(%round, stage = %state.stage(), error = %err, "aborting run");
                    *state = RunState::Aborted;
                }
                None => tracing::warn!(error = %err, "round rejected"),
            }
            Err(err)
        }
    }
}

fn sequence<P: RoundPhase>(run_id: RunId, stage: Stage) -> ProtocolError {
    tracing::warn!(%run_id, round = %P::ROUND, %stage, "round out of sequence");
    ProtocolError::Sequence {
        run_id,
        round: P::ROUND,
        stage,
    }
}
