//! Fixed-capacity arena with first-fit block reuse
//!
//! Design: One buffer acquired at construction and released on drop.
//! Blocks are tracked as offsets into that buffer; the buffer contents are
//! never touched by the arena itself.

use core::cell::RefCell;
use core::fmt;
use core::ptr::NonNull;
use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};

use tracing::debug;

use super::block::{BlockList, MemoryBlock};
use super::observer::{ArenaEvent, ArenaObserver, TracingObserver};
use super::MemoryResource;
use crate::errors::AllocError;

/// Alignment of the backing buffer's base address
pub const BUFFER_ALIGN: usize = 16;

/// Mutable bookkeeping, kept apart from the buffer so `&self` methods can update it
struct ArenaState {
    high_water: usize,
    used: BlockList,
    free: BlockList,
}

/// Fixed-capacity memory resource
///
/// Serves requests by first-fit reuse of freed blocks, then by bumping the
/// high-water mark. Freed blocks are neither split nor merged. The alignment
/// hint passed to [`MemoryResource::allocate`] is ignored; a block is aligned
/// only as far as its offset and [`BUFFER_ALIGN`] allow.
pub struct FixedBlockResource {
    buffer: NonNull<u8>,
    capacity: usize,
    state: RefCell<ArenaState>,
    observer: Box<dyn ArenaObserver>,
}

impl FixedBlockResource {
    /// Create an arena of `capacity` bytes reporting to [`TracingObserver`]
    pub fn new(capacity: usize) -> Result<Self, AllocError> {
        Self::with_observer(capacity, TracingObserver)
    }

    /// Create an arena of `capacity` bytes reporting to `observer`
    pub fn with_observer(
        capacity: usize,
        observer: impl ArenaObserver + 'static,
    ) -> Result<Self, AllocError> {
        let layout = Self::buffer_layout(capacity)?;
        let buffer = if capacity == 0 {
            NonNull::<u8>::dangling()
        } else {
            // Safety: layout has non-zero size
            let ptr = unsafe { alloc(layout) };
            NonNull::new(ptr).unwrap_or_else(|| handle_alloc_error(layout))
        };

        debug!(target: "pmr_stack::arena", capacity, "arena created");

        Ok(Self {
            buffer,
            capacity,
            state: RefCell::new(ArenaState {
                high_water: 0,
                used: BlockList::new(),
                free: BlockList::new(),
            }),
            observer: Box::new(observer),
        })
    }

    fn buffer_layout(capacity: usize) -> Result<Layout, AllocError> {
        Layout::from_size_align(capacity, BUFFER_ALIGN)
            .map_err(|_| AllocError::InvalidCapacity { capacity })
    }

    /// Total buffer size in bytes
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Offset of the next never-used byte
    #[inline]
    pub fn high_water(&self) -> usize {
        self.state.borrow().high_water
    }

    /// Whether `ptr` is the start of a block currently handed out
    pub fn owns(&self, ptr: NonNull<u8>) -> bool {
        match self.offset_of(ptr) {
            Some(offset) => self.state.borrow().used.contains_offset(offset),
            None => false,
        }
    }

    /// Snapshot of the free list in reuse order
    pub fn free_blocks(&self) -> Vec<MemoryBlock> {
        self.state.borrow().free.iter().copied().collect()
    }

    pub fn stats(&self) -> ArenaStats {
        let state = self.state.borrow();
        ArenaStats {
            capacity: self.capacity,
            high_water: state.high_water,
            used_blocks: state.used.len(),
            used_bytes: state.used.total_bytes(),
            free_blocks: state.free.len(),
            free_bytes: state.free.total_bytes(),
        }
    }

    #[inline]
    fn address_of(&self, offset: usize) -> usize {
        self.buffer.as_ptr() as usize + offset
    }

    fn offset_of(&self, ptr: NonNull<u8>) -> Option<usize> {
        let offset = (ptr.as_ptr() as usize).checked_sub(self.buffer.as_ptr() as usize)?;
        (offset < self.capacity).then_some(offset)
    }

    fn block_ptr(&self, block: MemoryBlock) -> NonNull<u8> {
        // Safety: offset < high_water <= capacity, so the result stays inside the buffer
        unsafe { NonNull::new_unchecked(self.buffer.as_ptr().add(block.offset)) }
    }
}

// SAFETY: blocks are carved from disjoint ranges of the owned buffer and a
// block is only handed out again after `deallocate` moved it to the free list.
unsafe impl MemoryResource for FixedBlockResource {
    fn allocate(&self, bytes: usize, _align: usize) -> Result<NonNull<u8>, AllocError> {
        // Zero-sized requests still need a distinct offset to be freed by address
        let bytes = bytes.max(1);
        let mut state = self.state.borrow_mut();

        if let Some(block) = state.free.take_first_fit(bytes) {
            state.used.push(block);
            drop(state);
            self.observer.on_event(&ArenaEvent::AllocReuse {
                address: self.address_of(block.offset),
                offset: block.offset,
                size: block.size,
            });
            return Ok(self.block_ptr(block));
        }

        let available = self.capacity - state.high_water;
        if bytes > available {
            return Err(AllocError::OutOfMemory { requested: bytes, available });
        }

        let block = MemoryBlock::new(state.high_water, bytes);
        state.high_water = block.end();
        state.used.push(block);
        drop(state);

        self.observer.on_event(&ArenaEvent::AllocNew {
            address: self.address_of(block.offset),
            offset: block.offset,
            size: block.size,
        });
        Ok(self.block_ptr(block))
    }

    /// Unknown addresses are ignored, including repeated frees of one block
    unsafe fn deallocate(&self, ptr: NonNull<u8>, _bytes: usize, _align: usize) {
        let Some(offset) = self.offset_of(ptr) else {
            return;
        };
        let mut state = self.state.borrow_mut();
        let Some(block) = state.used.take_at(offset) else {
            return;
        };
        state.free.push(block);
        drop(state);

        self.observer.on_event(&ArenaEvent::DeallocFree {
            address: self.address_of(block.offset),
            offset: block.offset,
            size: block.size,
        });
    }

    fn is_equal(&self, other: &dyn MemoryResource) -> bool {
        core::ptr::eq(
            self as *const Self as *const u8,
            other as *const dyn MemoryResource as *const u8,
        )
    }
}

impl PartialEq for FixedBlockResource {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self, other)
    }
}

impl Eq for FixedBlockResource {}

impl fmt::Debug for FixedBlockResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixedBlockResource")
            .field("buffer", &self.buffer)
            .field("stats", &self.stats())
            .finish()
    }
}

impl Drop for FixedBlockResource {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if !state.used.is_empty() {
            let event = ArenaEvent::Leak {
                blocks: state.used.len(),
                bytes: state.used.total_bytes(),
            };
            self.observer.on_event(&event);
        }

        if self.capacity != 0 {
            // Layout was validated in `with_observer`
            if let Ok(layout) = Self::buffer_layout(self.capacity) {
                unsafe { dealloc(self.buffer.as_ptr(), layout) };
            }
        }
    }
}

/// Arena occupancy snapshot for monitoring and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaStats {
    pub capacity: usize,
    pub high_water: usize,
    pub used_blocks: usize,
    pub used_bytes: usize,
    pub free_blocks: usize,
    pub free_bytes: usize,
}

impl ArenaStats {
    /// Bytes never handed out
    pub fn untouched(&self) -> usize {
        self.capacity - self.high_water
    }
}
