//! Block records - offset/size bookkeeping for used and free ranges

use smallvec::SmallVec;

/// A byte range `[offset, offset + size)` inside an arena buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryBlock {
    pub offset: usize,
    pub size: usize,
}

impl MemoryBlock {
    #[inline]
    pub const fn new(offset: usize, size: usize) -> Self {
        Self { offset, size }
    }

    /// One past the last byte of the block
    #[inline]
    pub const fn end(&self) -> usize {
        self.offset + self.size
    }
}

/// Unordered list of block records
///
/// Most arenas hold a handful of live blocks, so records stay inline until
/// the list outgrows its first chunk.
#[derive(Debug, Default)]
pub(crate) struct BlockList {
    blocks: SmallVec<[MemoryBlock; 16]>,
}

impl BlockList {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, block: MemoryBlock) {
        self.blocks.push(block);
    }

    /// Remove and return the first block of at least `size` bytes
    pub(crate) fn take_first_fit(&mut self, size: usize) -> Option<MemoryBlock> {
        let index = self.blocks.iter().position(|block| block.size >= size)?;
        Some(self.blocks.remove(index))
    }

    /// Remove and return the block starting exactly at `offset`
    pub(crate) fn take_at(&mut self, offset: usize) -> Option<MemoryBlock> {
        let index = self.blocks.iter().position(|block| block.offset == offset)?;
        Some(self.blocks.remove(index))
    }

    pub(crate) fn contains_offset(&self, offset: usize) -> bool {
        self.blocks.iter().any(|block| block.offset == offset)
    }

    pub(crate) fn len(&self) -> usize {
        self.blocks.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub(crate) fn total_bytes(&self) -> usize {
        self.blocks.iter().map(|block| block.size).sum()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &MemoryBlock> {
        self.blocks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_fit_takes_earliest_large_enough() {
        let mut list = BlockList::new();
        list.push(MemoryBlock::new(0, 8));
        list.push(MemoryBlock::new(8, 32));
        list.push(MemoryBlock::new(40, 16));

        assert_eq!(list.take_first_fit(16), Some(MemoryBlock::new(8, 32)));
        assert_eq!(list.take_first_fit(16), Some(MemoryBlock::new(40, 16)));
        assert_eq!(list.take_first_fit(16), None);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn take_at_requires_exact_offset() {
        let mut list = BlockList::new();
        list.push(MemoryBlock::new(16, 16));

        assert_eq!(list.take_at(20), None);
        assert_eq!(list.take_at(16), Some(MemoryBlock::new(16, 16)));
        assert!(list.is_empty());
    }
}
