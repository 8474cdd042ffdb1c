//! Bounded circular queue.
//!
//! The capacity is whatever storage the queue is built on, either an inline
//! array (`[T; N]`) or a slice allocated once at construction time. It never
//! grows. `T` is a plain copyable value: raw bytes for byte streams, event
//! handles for EPA queues.

use core::marker::PhantomData;

pub struct RingBuffer<T, S> {
    storage: S,
    head: usize,
    tail: usize,
    len: usize,
    min_free: usize,
    _item: PhantomData<T>,
}

impl<T, S> RingBuffer<T, S>
where
    T: Copy,
    S: AsRef<[T]> + AsMut<[T]>,
{
    /// Wraps `storage` as an empty queue; its current contents are ignored.
    pub fn new(storage: S) -> Self {
        let capacity = storage.as_ref().len();
        Self {
            storage,
            head: 0,
            tail: 0,
            len: 0,
            min_free: capacity,
            _item: PhantomData,
        }
    }

    pub fn capacity(&self) -> usize {
        self.storage.as_ref().len()
    }

    pub fn occupied(&self) -> usize {
        self.len
    }

    pub fn free_space(&self) -> usize {
        self.capacity() - self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Lowest free space observed since construction
    pub fn min_free(&self) -> usize {
        self.min_free
    }

    /// Appends at the tail (FIFO). Hands the item back when full.
    pub fn put(&mut self, item: T) -> Result<(), T> {
        if self.is_full() {
            return Err(item);
        }
        let capacity = self.capacity();
        self.storage.as_mut()[self.tail] = item;
        self.tail = (self.tail + 1) % capacity;
        self.len += 1;
        self.track_free();
        Ok(())
    }

    /// Inserts at the head (LIFO), ahead of everything already queued.
    pub fn put_ahead(&mut self, item: T) -> Result<(), T> {
        if self.is_full() {
            return Err(item);
        }
        let capacity = self.capacity();
        self.head = (self.head + capacity - 1) % capacity;
        self.storage.as_mut()[self.head] = item;
        self.len += 1;
        self.track_free();
        Ok(())
    }

    /// Removes the item at the head.
    pub fn get(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let item = self.storage.as_ref()[self.head];
        self.head = (self.head + 1) % self.capacity();
        self.len -= 1;
        Some(item)
    }

    pub fn peek(&self) -> Option<T> {
        if self.is_empty() {
            None
        } else {
            Some(self.storage.as_ref()[self.head])
        }
    }

    /// Queued items, head first
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        let capacity = self.capacity();
        let storage = self.storage.as_ref();
        (0..self.len).map(move |offset| storage[(self.head + offset) % capacity])
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.len = 0;
    }

    fn track_free(&mut self) {
        let free = self.free_space();
        if free < self.min_free {
            self.min_free = free;
        }
    }
}
