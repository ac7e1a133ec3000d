//! Storage provider for the variable-size session buffer. The default
//! [`HeapAllocator`] uses the global allocator; boards with a dedicated pool
//! plug their own implementation per handle.
use alloc::vec::Vec;

/// Hands out and takes back the buffer of one transfer at a time.
pub trait BufferAllocator {
    /// Owned, fixed-size byte storage.
    type Buffer: AsRef<[u8]> + AsMut<[u8]>;

    /// Provide a zeroed buffer of exactly `size` bytes, or `None` when the
    /// memory is not available.
    fn allocate(&mut self, size: usize) -> Option<Self::Buffer>;

    /// Take a buffer back.
    fn free(&mut self, buffer: Self::Buffer) {
        drop(buffer);
    }
}

/// Global-heap allocator used when the board does not provide one.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeapAllocator;

impl BufferAllocator for HeapAllocator {
    type Buffer = Vec<u8>;

    fn allocate(&mut self, size: usize) -> Option<Self::Buffer> {
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(size).ok()?;
        buffer.resize(size, 0);
        Some(buffer)
    }
}
