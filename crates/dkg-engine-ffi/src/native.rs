use super::{
    abi::{self, NativeAbi},
    bridge::Bridge,
};
use dkg_core::primitives::Round;
use std::{os::raw::c_char, ptr::NonNull};

#[link(name = "ted")]
extern "C" {
    #[link_name = "init"]
    fn ted_init(request: *const c_char) -> *mut c_char;

    #[link_name = "commit"]
    fn ted_commit(request: *const c_char) -> *mut c_char;

    #[link_name = "finalize"]
    fn ted_finalize(request: *const c_char) -> *mut c_char;
}

#[cfg(feature = "engine-free-string")]
#[link(name = "ted")]
extern "C" {
    #[link_name = "free_string"]
    fn ted_free_string(response: *mut c_char);
}

/// The engine linked into this binary.
///
/// `libted` exports `init`, `commit` and `finalize` only, and hands out its
/// responses through `CString::into_raw` on the system allocator. Responses
/// are reclaimed the same way here. An engine build exporting its own
/// `free_string` is used instead with the `engine-free-string` feature.
#[derive(Clone, Copy, Debug, Default)]
pub struct LinkedAbi;

impl NativeAbi for LinkedAbi {
    unsafe fn invoke(&self, round: Round, request: *const c_char) -> *mut c_char {
        match round {
            Round::Init => ted_init(request),
            Round::Commit => ted_commit(request),
            Round::Finalize => ted_finalize(request),
        }
    }

    #[cfg(not(feature = "engine-free-string"))]
    unsafe fn release_response(&self, response: NonNull<c_char>) {
        abi::reclaim_cstring(response)
    }

    #[cfg(feature = "engine-free-string")]
    unsafe fn release_response(&self, response: NonNull<c_char>) {
        ted_free_string(response.as_ptr())
    }
}

/// Returns a bridge to the linked engine
pub fn linked() -> Bridge<LinkedAbi> {
    Bridge::new(LinkedAbi)
}
