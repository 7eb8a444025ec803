//! Memory resources - fixed-capacity block arena
//!
//! Design: Two-step allocation policy over one pre-allocated buffer:
//! 1. First-fit reuse of a previously freed block (whole block, no splitting)
//! 2. Bump allocation from the high-water mark
//!
//! Freed blocks are never coalesced. Every allocation, deallocation and
//! teardown leak is reported to a pluggable [`ArenaObserver`].

mod block;
mod fixed;
mod observer;

#[cfg(test)]
mod tests;

pub use block::MemoryBlock;
pub use fixed::{ArenaStats, FixedBlockResource, BUFFER_ALIGN};
pub use observer::{
    ArenaEvent, ArenaObserver, EventFormat, NullObserver, RecordingObserver, TracingObserver,
    WriterObserver,
};

use core::ptr::NonNull;

use crate::errors::AllocError;

/// Allocation capability consumed by containers such as [`PmrStack`](crate::PmrStack)
///
/// Methods take `&self`; implementations keep their bookkeeping behind
/// interior mutability and are not expected to be shared across threads.
///
/// # Safety
///
/// A block returned by `allocate` must be valid for reads and writes of
/// `bytes` bytes and must not overlap any other live block from the same
/// resource until it is passed to `deallocate`. Containers write values
/// straight through the returned pointer and rely on this.
pub unsafe trait MemoryResource {
    /// Obtain a block of at least `bytes` bytes
    ///
    /// `align` is a hint; implementations may ignore it, so callers that
    /// need aligned storage must check the returned address.
    fn allocate(&self, bytes: usize, align: usize) -> Result<NonNull<u8>, AllocError>;

    /// Return a block previously obtained from `allocate`
    ///
    /// # Safety
    ///
    /// The caller must not access the block after this call.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, bytes: usize, align: usize);

    /// Whether memory allocated from `self` can be deallocated through `other`
    fn is_equal(&self, other: &dyn MemoryResource) -> bool;
}
