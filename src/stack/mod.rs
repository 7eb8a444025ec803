//! Arena-backed LIFO stack
//!
//! Design: Singly-linked chain whose nodes live in blocks obtained from a
//! [`MemoryResource`]. The stack owns the chain from `head`; every node is
//! written into its block on push and read back out (or dropped in place)
//! before the block is returned on pop.

mod iter;


pub use iter::Iter;

use core::alloc::Layout;
use core::fmt;
use core::marker::PhantomData;
use core::mem;
use core::ptr::{self, NonNull};
use std::convert::Infallible;

use tracing::debug;

use crate::allocator::{FixedBlockResource, MemoryResource};
use crate::errors::StackError;

pub(crate) struct Node<T> {
    pub(crate) value: T,
    pub(crate) next: Option<NonNull<Node<T>>>,
}

/// Block layout requested from the resource for each element of type `T`
pub fn node_layout<T>() -> Layout {
    Layout::new::<Node<T>>()
}

/// Returns a node block to its resource when dropped
///
/// Armed between allocation and a successful link, and around the in-place
/// drop of a popped value, so neither an error nor a panic leaks the block.
struct BlockGuard<'r, R: MemoryResource + ?Sized> {
    resource: &'r R,
    block: NonNull<u8>,
    layout: Layout,
}

impl<'r, R: MemoryResource + ?Sized> BlockGuard<'r, R> {
    fn disarm(self) {
        mem::forget(self);
    }
}

impl<'r, R: MemoryResource + ?Sized> Drop for BlockGuard<'r, R> {
    fn drop(&mut self) {
        unsafe {
            self.resource
                .deallocate(self.block, self.layout.size(), self.layout.align())
        };
    }
}

/// LIFO container whose nodes are allocated from `R`
///
/// The resource must outlive the stack; dropping the stack clears it and
/// returns every block.
pub struct PmrStack<'r, T, R: MemoryResource + ?Sized = FixedBlockResource> {
    head: Option<NonNull<Node<T>>>,
    resource: &'r R,
    _owns: PhantomData<Node<T>>,
}

impl<'r, T, R: MemoryResource + ?Sized> PmrStack<'r, T, R> {
    pub fn new(resource: &'r R) -> Self {
        Self {
            head: None,
            resource,
            _owns: PhantomData,
        }
    }

    /// Resource the nodes are allocated from
    #[inline]
    pub fn resource(&self) -> &'r R {
        self.resource
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Number of elements, counted by walking the chain
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Push `value` on top
    pub fn push(&mut self, value: T) -> Result<(), StackError> {
        self.emplace(|| value)
    }

    /// Push the value returned by `make`, building it after the node block is reserved
    ///
    /// If `make` panics the block is returned before unwinding continues.
    pub fn emplace<F>(&mut self, make: F) -> Result<(), StackError>
    where
        F: FnOnce() -> T,
    {
        self.try_emplace(|| Ok::<T, Infallible>(make()))
    }

    /// Push the value returned by `make`, or report its error
    ///
    /// On any failure the stack is left untouched and no block stays in use.
    pub fn try_emplace<E, F>(&mut self, make: F) -> Result<(), StackError<E>>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let layout = node_layout::<T>();
        let block = self.resource.allocate(layout.size(), layout.align())?;
        let guard = BlockGuard {
            resource: self.resource,
            block,
            layout,
        };

        let address = block.as_ptr() as usize;
        if address % layout.align() != 0 {
            debug!(target: "pmr_stack::stack", address, align = layout.align(), "misaligned node block");
            return Err(StackError::Misaligned {
                align: layout.align(),
                address,
            });
        }

        let value = match make() {
            Ok(value) => value,
            Err(err) => {
                debug!(target: "pmr_stack::stack", address, "element construction failed, block returned");
                return Err(StackError::ConstructionFailure(err));
            }
        };

        let node = block.cast::<Node<T>>();
        // Safety: block is exclusively ours, large enough and aligned for Node<T>
        unsafe {
            node.as_ptr().write(Node {
                value,
                next: self.head,
            });
        }
        guard.disarm();
        self.head = Some(node);
        Ok(())
    }

    /// Remove the top element, if any
    pub fn pop(&mut self) {
        let Some(node) = self.unlink_head() else {
            return;
        };
        let _guard = self.guard_for(node);
        // Safety: node was unlinked, so nothing else reaches its value
        unsafe { ptr::drop_in_place(ptr::addr_of_mut!((*node.as_ptr()).value)) };
    }

    /// Remove the top element and return it
    pub fn pop_value(&mut self) -> Option<T> {
        let node = self.unlink_head()?;
        let _guard = self.guard_for(node);
        // Safety: node was unlinked; its block is freed without dropping the value again
        Some(unsafe { ptr::addr_of!((*node.as_ptr()).value).read() })
    }

    /// Detach the head node; the caller takes over its value and block
    fn unlink_head(&mut self) -> Option<NonNull<Node<T>>> {
        let node = self.head?;
        // Safety: head always points at a live node written by `try_emplace`
        self.head = unsafe { (*node.as_ptr()).next };
        Some(node)
    }

    fn guard_for(&self, node: NonNull<Node<T>>) -> BlockGuard<'r, R> {
        BlockGuard {
            resource: self.resource,
            block: node.cast(),
            layout: node_layout::<T>(),
        }
    }

    /// Reference to the most recently pushed element
    pub fn top(&self) -> Result<&T, StackError> {
        match self.head {
            // Safety: head is live for as long as `self` is borrowed
            Some(node) => Ok(unsafe { &(*node.as_ptr()).value }),
            None => Err(StackError::EmptyContainer),
        }
    }

    pub fn top_mut(&mut self) -> Result<&mut T, StackError> {
        match self.head {
            Some(node) => Ok(unsafe { &mut (*node.as_ptr()).value }),
            None => Err(StackError::EmptyContainer),
        }
    }

    /// Pop until empty
    pub fn clear(&mut self) {
        while !self.is_empty() {
            self.pop();
        }
    }

    /// Iterate from the most recently pushed element to the oldest
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self.head)
    }
}

impl<'r, T, R: MemoryResource + ?Sized> Drop for PmrStack<'r, T, R> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<'a, 'r, T, R: MemoryResource + ?Sized> IntoIterator for &'a PmrStack<'r, T, R> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'r, T: fmt::Debug, R: MemoryResource + ?Sized> fmt::Debug for PmrStack<'r, T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
