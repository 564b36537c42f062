//! Fixed-capacity, power-of-two, single-producer single-consumer ring.
//!
//! One slot is reserved as a full/empty sentinel, so usable capacity is
//! `C - 1`. `push`/`pop` never block. `size`/`fill_factor` are
//! observation-only: they may read a cursor that has since moved, which is
//! fine for a controller sampling load but must never be used to decide
//! correctness.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct SpscRing<T> {
    buf: Box<[UnsafeCell<MaybeUninit<T>>]>,
    mask: usize,
    head: AtomicUsize, // next slot the producer will write
    tail: AtomicUsize, // next slot the consumer will read
}

// SAFETY: `head`/`tail` give each thread exclusive access to disjoint
// index ranges; T only needs to be Send across the handoff.
unsafe impl<T: Send> Sync for SpscRing<T> {}
unsafe impl<T: Send> Send for SpscRing<T> {}

impl<T> SpscRing<T> {
    /// `capacity` must be a power of two (usable capacity is `capacity - 1`).
    pub fn new(capacity: usize) -> Self {
        assert!(
            capacity.is_power_of_two() && capacity >= 2,
            "ring capacity must be a power of two >= 2"
        );
        let buf = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            buf,
            mask: capacity - 1,
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Non-blocking push. Returns `false` (and drops nothing — the value
    /// is returned to the caller via `Err`) when the ring is full.
    pub fn push(&self, value: T) -> Result<(), T> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if head.wrapping_sub(tail) == self.mask {
            return Err(value);
        }
        let idx = head & self.mask;
        // SAFETY: slot `idx` is not owned by the consumer: it becomes
        // visible to it only after the Release store below.
        unsafe {
            (*self.buf[idx].get()).write(value);
        }
        self.head.store(head.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    /// Non-blocking pop. Returns `None` when the ring is empty.
    pub fn pop(&self) -> Option<T> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if tail == head {
            return None;
        }
        let idx = tail & self.mask;
        // SAFETY: the Acquire load of `head` above synchronizes-with the
        // producer's Release store, so the write at `idx` is visible.
        let value = unsafe { (*self.buf[idx].get()).assume_init_read() };
        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        Some(value)
    }

    /// Observation-only occupancy; may be stale by the time it is read.
    pub fn size(&self) -> usize {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        head.wrapping_sub(tail)
    }

    /// `size() / (capacity - 1)`, always in `[0.0, 1.0]`.
    pub fn fill_factor(&self) -> f64 {
        self.size() as f64 / self.mask as f64
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }
}

impl<T> Drop for SpscRing<T> {
    fn drop(&mut self) {
        // Drain any values still owned by the ring so T's destructor runs.
        while self.pop().is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_preserve_order() {
        let ring: SpscRing<u32> = SpscRing::new(4);
        assert!(ring.push(1).is_ok());
        assert!(ring.push(2).is_ok());
        assert!(ring.push(3).is_ok());
        assert_eq!(ring.pop(), Some(1));
        assert_eq!(ring.pop(), Some(2));
        assert_eq!(ring.pop(), Some(3));
        assert_eq!(ring.pop(), None);
        assert_eq!(ring.size(), 0);
    }

    #[test]
    fn fourth_push_on_capacity_four_ring_fails() {
        let ring: SpscRing<u32> = SpscRing::new(4);
        assert!(ring.push(1).is_ok());
        assert!(ring.push(2).is_ok());
        assert!(ring.push(3).is_ok());
        assert_eq!(ring.push(4), Err(4));
        assert_eq!(ring.pop(), Some(1));
        assert_eq!(ring.pop(), Some(2));
        assert_eq!(ring.pop(), Some(3));
    }

    #[test]
    #[should_panic]
    fn new_rejects_non_power_of_two_capacity() {
        let _: SpscRing<u32> = SpscRing::new(3);
    }

    #[test]
    fn size_and_fill_factor_stay_in_range() {
        let ring: SpscRing<u32> = SpscRing::new(8);
        for i in 0..7 {
            ring.push(i).unwrap();
            assert!(ring.size() <= 7);
            assert!(ring.fill_factor() >= 0.0 && ring.fill_factor() <= 1.0);
        }
    }

    #[test]
    fn concurrent_producer_consumer_round_trips_all_items() {
        use std::sync::Arc;
        use std::thread;

        let ring: Arc<SpscRing<u64>> = Arc::new(SpscRing::new(1024));
        const N: u64 = 200_000;

        let producer = {
            let ring = ring.clone();
            thread::spawn(move || {
                let mut i = 0;
                while i < N {
                    if ring.push(i).is_ok() {
                        i += 1;
                    } else {
                        thread::yield_now();
                    }
                }
            })
        };

        let consumer = thread::spawn(move || {
            let mut next = 0u64;
            while next < N {
                if let Some(v) = ring.pop() {
                    assert_eq!(v, next);
                    next += 1;
                } else {
                    thread::yield_now();
                }
            }
        });

        producer.join().unwrap();
        consumer.join().unwrap();
    }
}
