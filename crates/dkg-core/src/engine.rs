//! # Engine
//!
//! The engine is the opaque cryptographic implementation P0 delegates every
//! round to. It is reached through three string-in, string-out entry points.
use super::primitives::{BridgeFault, Fault, Round};
use std::{any::Any, sync::Arc, time::Duration};
use tokio::task;

/// Trait which must be implemented by anything that can run the engine's
/// entry points. Calls are blocking and single-shot, and the engine is not
/// assumed to be idempotent, so a failed call is never repeated.
pub trait Engine: Send + Sync {
    /// Creates P0's key and part for a run
    fn call_init(&self, request: &str) -> Result<String, Fault>;

    /// Processes P1's part and acknowledgments and produces P0's
    fn call_commit(&self, request: &str) -> Result<String, Fault>;

    /// Completes the run and checks P1's signature share
    fn call_finalize(&self, request: &str) -> Result<String, Fault>;

    /// Dispatches to the entry point of `round`
    fn call(&self, round: Round, request: &str) -> Result<String, Fault> {
        match round {
            Round::Init => self.call_init(request),
            Round::Commit => self.call_commit(request),
            Round::Finalize => self.call_finalize(request),
        }
    }
}

impl<E: Engine + ?Sized> Engine for Arc<E> {
    fn call_init(&self, request: &str) -> Result<String, Fault> {
        (**self).call_init(request)
    }

    fn call_commit(&self, request: &str) -> Result<String, Fault> {
        (**self).call_commit(request)
    }

    fn call_finalize(&self, request: &str) -> Result<String, Fault> {
        (**self).call_finalize(request)
    }
}

/// Runs an engine call on the blocking pool and gives up after `timeout`.
///
/// On timeout the call keeps running to completion on its thread, and the
/// buffers it owns are released there once the engine returns.
pub async fn call_bounded(
    engine: Arc<dyn Engine>,
    round: Round,
    request: String,
    timeout: Duration,
) -> Result<String, Fault> {
    let handle = task::spawn_blocking(move || engine.call(round, &request));

    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(err)) if err.is_panic() => {
            let payload = err.into_panic();
            Err(BridgeFault::Panicked(panic_message(payload.as_ref())).into())
        }
        Ok(Err(_)) => Err(BridgeFault::Cancelled.into()),
        Err(_) => {
            tracing::error!(%round, ?timeout, "engine call timed out");
            Err(BridgeFault::Timeout(timeout).into())
        }
    }
}

/// Extracts the message of a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}
