//! Frame buffer pool: N preallocated BGRA buffers shared between the frame
//! grabber (writer) and the JPEG encoder (reader) without a lock.
//!
//! Safety: a buffer index is only ever readable by the encoder after it has
//! been popped from ring R1, and R1's release/acquire cursor pair makes the
//! grabber's write happen-before the encoder's read. The pool itself never
//! arbitrates access; the index is the capability token.

use std::cell::UnsafeCell;

struct Slot(UnsafeCell<Vec<u8>>);

// SAFETY: access to a slot is always mediated by the SPSC ring that carries
// its index; see module docs.
unsafe impl Sync for Slot {}

pub struct FrameBufferPool {
    slots: Vec<Slot>,
    frame_bytes: usize,
    width: u32,
    height: u32,
}

impl FrameBufferPool {
    /// `n` must be a power of two (mirrors the ring capacity convention);
    /// the spec default is 4.
    pub fn new(width: u32, height: u32, n: usize) -> Self {
        assert!(n.is_power_of_two(), "pool size must be a power of two");
        let frame_bytes = width as usize * height as usize * 4;
        let slots = (0..n)
            .map(|_| Slot(UnsafeCell::new(vec![0u8; frame_bytes])))
            .collect();
        Self {
            slots,
            frame_bytes,
            width,
            height,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn frame_bytes(&self) -> usize {
        self.frame_bytes
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Exclusive write access. Caller (the grabber thread) must own `index`
    /// for the duration of the call and must not call this concurrently
    /// with [`read`](Self::read) on the same index.
    ///
    /// # Safety
    /// The caller must guarantee no other thread holds the read or write
    /// capability for `index` at the same time.
    pub unsafe fn write<R>(&self, index: usize, f: impl FnOnce(&mut [u8]) -> R) -> R {
        let buf = &mut *self.slots[index].0.get();
        f(buf.as_mut_slice())
    }

    /// Read access granted by having popped `index` off the handoff ring.
    ///
    /// # Safety
    /// The caller must guarantee the grabber is not concurrently writing
    /// `index` (true once `index` has been observed popped from the ring
    /// that synchronizes the handoff).
    pub unsafe fn read<R>(&self, index: usize, f: impl FnOnce(&[u8]) -> R) -> R {
        let buf = &*self.slots[index].0.get();
        f(buf.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_allocates_n_slots_of_correct_size() {
        let pool = FrameBufferPool::new(16, 8, 4);
        assert_eq!(pool.len(), 4);
        assert_eq!(pool.frame_bytes(), 16 * 8 * 4);
    }

    #[test]
    #[should_panic]
    fn new_rejects_non_power_of_two() {
        FrameBufferPool::new(16, 8, 3);
    }

    #[test]
    fn write_then_read_round_trips() {
        let pool = FrameBufferPool::new(2, 2, 2);
        unsafe {
            pool.write(0, |buf| buf.fill(0xAB));
            pool.read(0, |buf| assert!(buf.iter().all(|&b| b == 0xAB)));
        }
    }
}
