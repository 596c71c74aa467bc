use dkg_core::primitives::{BridgeFault, Round};
use std::{
    ffi::{CStr, CString},
    os::raw::c_char,
    ptr::NonNull,
};

/// The entry points exported by a native engine. Requests and responses are
/// NUL-terminated JSON strings.
///
/// Request buffers are allocated by the bridge and only borrowed by the
/// engine for the duration of the call. Response buffers are allocated by
/// the engine and must be handed back to it once they have been copied out.
pub trait NativeAbi: Send + Sync + 'static {
    /// Copies `request` into a NUL-terminated buffer
    fn alloc_request(&self, request: &str) -> Result<NonNull<c_char>, BridgeFault> {
        let request =
            CString::new(request).map_err(|err| BridgeFault::InteriorNul(err.nul_position()))?;
        NonNull::new(request.into_raw()).ok_or(BridgeFault::AllocationFailed)
    }

    /// Releases a buffer returned by `alloc_request`
    ///
    /// # Safety
    ///
    /// `request` must come from `alloc_request` on this ABI and must not have
    /// been released already.
    unsafe fn free_request(&self, request: NonNull<c_char>) {
        reclaim_cstring(request)
    }

    /// Runs the entry point of `round` and returns the engine-owned response,
    /// which may be null
    ///
    /// # Safety
    ///
    /// `request` must point to a NUL-terminated buffer which stays valid
    /// until the call returns.
    unsafe fn invoke(&self, round: Round, request: *const c_char) -> *mut c_char;

    /// Hands a response back to the engine's allocator
    ///
    /// # Safety
    ///
    /// `response` must have been returned by `invoke` on this ABI and must
    /// not have been released already.
    unsafe fn release_response(&self, response: NonNull<c_char>);
}

/// Frees a string handed out through `CString::into_raw`. This is how engines
/// written in Rust return their responses, so it serves as their
/// `release_response` when they export no deallocator of their own.
///
/// # Safety
///
/// `ptr` must come from `CString::into_raw` in a module sharing this
/// process's allocator, and must not be used afterwards.
pub unsafe fn reclaim_cstring(ptr: NonNull<c_char>) {
    drop(CString::from_raw(ptr.as_ptr()));
}

/// A request buffer which is released when dropped
pub(crate) struct RequestBuffer<'a, A: NativeAbi> {
    abi: &'a A,
    ptr: NonNull<c_char>,
}

impl<'a, A: NativeAbi> RequestBuffer<'a, A> {
    pub(crate) fn new(abi: &'a A, request: &str) -> Result<Self, BridgeFault> {
        let ptr = abi.alloc_request(request)?;
        Ok(Self { abi, ptr })
    }

    pub(crate) fn as_ptr(&self) -> *const c_char {
        self.ptr.as_ptr()
    }
}

impl<A: NativeAbi> Drop for RequestBuffer<'_, A> {
    fn drop(&mut self) {
        // SAFETY: the pointer came from `alloc_request` and is only released here
        unsafe { self.abi.free_request(self.ptr) }
    }
}

/// A response owned by the engine, handed back to it when dropped
pub(crate) struct ResponseBuffer<'a, A: NativeAbi> {
    abi: &'a A,
    ptr: NonNull<c_char>,
}

impl<'a, A: NativeAbi> ResponseBuffer<'a, A> {
    pub(crate) fn new(abi: &'a A, ptr: *mut c_char) -> Result<Self, BridgeFault> {
        let ptr = NonNull::new(ptr).ok_or(BridgeFault::NullResponse)?;
        Ok(Self { abi, ptr })
    }

    /// Copies the response out of engine memory
    pub(crate) fn to_vec(&self) -> Vec<u8> {
        // SAFETY: the engine returns NUL-terminated strings which stay valid
        // until released
        unsafe { CStr::from_ptr(self.ptr.as_ptr()) }
            .to_bytes()
            .to_vec()
    }
}

impl<A: NativeAbi> Drop for ResponseBuffer<'_, A> {
    fn drop(&mut self) {
        // SAFETY: the pointer came from `invoke` and is only released here
        unsafe { self.abi.release_response(self.ptr) }
    }
}
