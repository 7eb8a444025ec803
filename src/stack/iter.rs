use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::ptr::NonNull;

use super::Node;

/// Read-only cursor over a [`PmrStack`](super::PmrStack), newest element first
///
/// Clone it to restart from the same position.
pub struct Iter<'a, T> {
    next: Option<NonNull<Node<T>>>,
    _marker: PhantomData<&'a Node<T>>,
}

impl<'a, T> Iter<'a, T> {
    pub(super) fn new(head: Option<NonNull<Node<T>>>) -> Self {
        Self {
            next: head,
            _marker: PhantomData,
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        // Safety: the stack is borrowed for 'a, so the chain cannot change under us
        let node = unsafe { &*node.as_ptr() };
        self.next = node.next;
        Some(&node.value)
    }
}

impl<T> FusedIterator for Iter<'_, T> {}

// Safety: `Iter` only hands out `&T`, like `core::slice::Iter`
unsafe impl<T: Sync> Send for Iter<'_, T> {}
unsafe impl<T: Sync> Sync for Iter<'_, T> {}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            next: self.next,
            _marker: PhantomData,
        }
    }
}
