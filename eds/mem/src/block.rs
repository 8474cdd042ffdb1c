use alloc::boxed::Box;
use core::fmt;

/// A block of memory handed out by a [`MemoryClass`](crate::MemoryClass).
///
/// The block owns its bytes; the requested length may be shorter than the
/// underlying capacity when the class rounds up (pools do).
pub struct Block {
    bytes: Box<[u8]>,
    len: usize,
}

impl Block {
    /// Wraps `bytes`, exposing only the first `len` of them.
    pub fn new(bytes: Box<[u8]>, len: usize) -> Self {
        let len = len.min(bytes.len());
        Self { bytes, len }
    }

    /// Requested length
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Underlying block size
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes[..self.len]
    }

    /// Gives the raw storage back to its class
    pub fn into_bytes(self) -> Box<[u8]> {
        self.bytes
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("len", &self.len)
            .field("capacity", &self.bytes.len())
            .finish()
    }
}
