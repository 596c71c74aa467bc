//! # DKG Engine FFI
//!
//! Bridges the string-in, string-out entry points of the native DKG engine
//! to the `Engine` trait of `dkg-core`. Every foreign buffer is held by a
//! guard which releases it exactly once, whether the call succeeds, the
//! engine reports an error or the call panics.

/// The raw native entry points and the guards around their buffers
mod abi;
pub use abi::{reclaim_cstring, NativeAbi};

/// Safe adapter from a `NativeAbi` to an `Engine`
mod bridge;
pub use bridge::{classify, Bridge};

/// The engine linked into the binary
#[cfg(feature = "native")]
mod native;
#[cfg(feature = "native")]
pub use native::{linked, LinkedAbi};
