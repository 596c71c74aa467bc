use dkg_core::primitives::Round;
use dkg_engine_ffi::{reclaim_cstring, Bridge, NativeAbi};
use serde_json::{json, Value};
use std::{
    ffi::{CStr, CString},
    os::raw::c_char,
    ptr::{self, NonNull},
};

type Script = dyn Fn(Round, &str) -> Option<String> + Send + Sync;

/// A native engine scripted in Rust. A `None` answer is returned to the
/// bridge as a null pointer.
pub struct StubAbi {
    script: Box<Script>,
}

impl StubAbi {
    pub fn bridge<F>(script: F) -> Bridge<Self>
    where
        F: Fn(Round, &str) -> Option<String> + Send + Sync + 'static,
    {
        Bridge::new(Self {
            script: Box::new(script),
        })
    }
}

impl NativeAbi for StubAbi {
    unsafe fn invoke(&self, round: Round, request: *const c_char) -> *mut c_char {
        let request = CStr::from_ptr(request).to_string_lossy();
        match (self.script)(round, &request) {
            Some(response) => CString::new(response)
                .map(CString::into_raw)
                .unwrap_or(ptr::null_mut()),
            None => ptr::null_mut(),
        }
    }

    unsafe fn release_response(&self, response: NonNull<c_char>) {
        reclaim_cstring(response)
    }
}

/// Answers like a well-behaved engine. P0's key mirrors P1's, and the share
/// verifies only for the expected message.
pub fn honest(round: Round, request: &str) -> Option<String> {
    let request: Value = serde_json::from_str(request).ok()?;
    let reply = match round {
        Round::Init => json!({
            "p0_pk": request["p1_pk"],
            "p0_part": { "degree": 1, "coeff": [[1, 2], [3, 4]] },
        }),
        Round::Commit => json!({ "p0_acks": [[5, 6]] }),
        Round::Finalize => json!({ "is_success": request["signed_msg_1"] == "Sign this" }),
    };
    Some(reply.to_string())
}
