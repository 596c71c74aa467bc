use super::{
    engine::Engine,
    primitives::{Fault, Round},
};
use serde_json::{json, Value};
use std::sync::Mutex;

type Responder = dyn Fn(Round, &str) -> Result<String, Fault> + Send + Sync;

/// An in-memory engine used for testing. It records every request it gets and
/// answers with whatever the responder returns.
pub struct ScriptedEngine {
    calls: Mutex<Vec<(Round, String)>>,
    respond: Box<Responder>,
}

impl ScriptedEngine {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(Round, &str) -> Result<String, Fault> + Send + Sync + 'static,
    {
        Self {
            calls: Mutex::new(vec![]),
            respond: Box::new(respond),
        }
    }

    /// An engine which behaves like a well-formed P0 engine: its public key is
    /// P1's key reversed, so replies can be matched to requests.
    #[allow(unused)]
    pub fn honest() -> Self {
        Self::new(|round, request| {
            let request: Value = serde_json::from_str(request).unwrap();
            let reply = match round {
                Round::Init => {
                    let mut pk = request["p1_pk"].as_array().unwrap().clone();
                    pk.reverse();
                    json!({
                        "p0_pk": pk,
                        "p0_part": { "degree": 1, "coeff": [[1, 2, 3], [4, 5, 6]] },
                    })
                }
                Round::Commit => json!({ "p0_acks": [[10, 11], [12]] }),
                Round::Finalize => json!({ "is_success": true, "public_key": vec![7u8; 48] }),
            };
            Ok(reply.to_string())
        })
    }

    pub fn calls(&self) -> Vec<(Round, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Engine for ScriptedEngine {
    fn call_init(&self, request: &str) -> Result<String, Fault> {
        self.record(Round::Init, request)
    }

    fn call_commit(&self, request: &str) -> Result<String, Fault> {
        self.record(Round::Commit, request)
    }

    fn call_finalize(&self, request: &str) -> Result<String, Fault> {
        self.record(Round::Finalize, request)
    }
}

impl ScriptedEngine {
    fn record(&self, round: Round, request: &str) -> Result<String, Fault> {
        self.calls
            .lock()
            .unwrap()
            .push((round, request.to_owned()));
        (self.respond)(round, request)
    }
}
