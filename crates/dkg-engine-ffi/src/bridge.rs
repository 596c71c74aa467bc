use super::abi::{NativeAbi, RequestBuffer, ResponseBuffer};
use dkg_core::{
    panic_message,
    primitives::{BridgeFault, EngineError, Fault, Round},
    Engine,
};
use serde_json::{Map, Value};
use std::panic::{self, AssertUnwindSafe};

/// The reserved field through which the engine reports its own failures
const ERROR_MARKER: &str = "error";

/// Adapts a native ABI to the `Engine` trait. Each call allocates the
/// request, runs the entry point once, copies the response out and releases
/// both buffers.
#[derive(Debug, Default)]
pub struct Bridge<A> {
    abi: A,
}

impl<A: NativeAbi> Bridge<A> {
    pub fn new(abi: A) -> Self {
        Self { abi }
    }

    pub fn abi(&self) -> &A {
        &self.abi
    }

    fn call_native(&self, round: Round, request: &str) -> Result<String, Fault> {
        tracing::debug!(%round, request_len = request.len(), "calling engine");

        let raw = panic::catch_unwind(AssertUnwindSafe(|| self.exchange(round, request)))
            .map_err(|payload| BridgeFault::Panicked(panic_message(payload.as_ref())))
            .and_then(|res| res)
            .map_err(|fault| {
                tracing::error!(%round, %fault, "engine call failed");
                Fault::from(fault)
            })?;

        tracing::debug!(%round, response_len = raw.len(), "engine answered");
        classify(raw).map_err(|fault| {
            tracing::warn!(%round, %fault, "engine call failed");
            fault
        })
    }

    // The request outlives the call and both buffers are released on unwind
    fn exchange(&self, round: Round, request: &str) -> Result<Vec<u8>, BridgeFault> {
        let request = RequestBuffer::new(&self.abi, request)?;
        // SAFETY: the request buffer is NUL-terminated and alive until the
        // end of this function
        let response = unsafe { self.abi.invoke(round, request.as_ptr()) };
        let response = ResponseBuffer::new(&self.abi, response)?;
        Ok(response.to_vec())
    }
}

impl<A: NativeAbi> Engine for Bridge<A> {
    fn call_init(&self, request: &str) -> Result<String, Fault> {
        self.call_native(Round::Init, request)
    }

    fn call_commit(&self, request: &str) -> Result<String, Fault> {
        self.call_native(Round::Commit, request)
    }

    fn call_finalize(&self, request: &str) -> Result<String, Fault> {
        self.call_native(Round::Finalize, request)
    }
}

/// Sorts a raw engine response into a success payload, an engine-reported
/// failure or a bridge fault. The payload is returned unmodified.
pub fn classify(raw: Vec<u8>) -> Result<String, Fault> {
    if raw.is_empty() {
        return Err(BridgeFault::EmptyResponse.into());
    }
    let text = String::from_utf8(raw).map_err(|err| BridgeFault::InvalidUtf8(err.to_string()))?;
    let value: Value = serde_json::from_str(&text)
        .map_err(|err| BridgeFault::MalformedResponse(err.to_string()))?;

    match value.get(ERROR_MARKER) {
        None | Some(Value::Null) => Ok(text),
        Some(err) => Err(engine_error(err).into()),
    }
}

fn engine_error(err: &Value) -> EngineError {
    match err {
        Value::Object(fields) => EngineError {
            code: fields.get("code").map(to_text),
            message: ["message", "msg", "e"]
                .iter()
                .find_map(|key| fields.get(*key))
                .map(to_text)
                .unwrap_or_else(|| describe(fields)),
        },
        other => EngineError {
            code: None,
            message: to_text(other),
        },
    }
}

fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn describe(fields: &Map<String, Value>) -> String {
    if fields.is_empty() {
        "unspecified engine error".to_owned()
    } else {
        Value::Object(fields.clone()).to_string()
    }
}
