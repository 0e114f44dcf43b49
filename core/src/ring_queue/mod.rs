//! A fixed-capacity, lock-free ring queue for the single-consumer /
//! multi-producer case: any number of threads push concurrently, but only
//! one thread at a time may drain.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;

/// A fixed-capacity ring buffer built for many concurrent producers and a
/// single consumer.
///
/// [`RingQueue::push`] never blocks: once the buffer is full, the oldest
/// unread entries are silently overwritten, exactly like a ring of fixed
/// size is expected to behave under sustained overproduction. There is no
/// resize and no backpressure; a consumer that wants every value must drain
/// faster than producers can fill the buffer.
///
/// Producers reserve a slot with a fetch-add on `tail_end`, write into it,
/// then advance `tail_start` up to (but not past) their own reserved index
/// with a compare-and-swap, one writer at a time, so a consumer reading
/// `tail_start` never observes a slot that is still being written.
/// [`RingQueue::get_all`] is `&mut self`: only one thread may hold that
/// reference at a time, which is the single-consumer half of the contract.
pub struct RingQueue<T> {
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
    capacity: usize,
    // Each counter is padded to its own cache line: `head` is written only
    // by the consumer and `tail_end`/`tail_start` only by producers, so
    // without padding every push and every drain would bounce the same
    // cache line back and forth between whichever cores touch each role.
    head: CachePadded<AtomicUsize>,
    tail_start: CachePadded<AtomicUsize>,
    tail_end: CachePadded<AtomicUsize>,
}

unsafe impl<T: Send> Send for RingQueue<T> {}
unsafe impl<T: Send> Sync for RingQueue<T> {}

impl<T> RingQueue<T> {
    /// Creates a queue holding at most `capacity` entries. Panics if
    /// `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring queue capacity must be non-zero");
        let slots = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            slots,
            capacity,
            head: CachePadded::new(AtomicUsize::new(0)),
            tail_start: CachePadded::new(AtomicUsize::new(0)),
            tail_end: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Pushes `value`, overwriting the oldest unread entry if the queue is
    /// full. Safe to call from any number of threads concurrently.
    pub fn push(&self, value: T) {
        let index = self.tail_end.fetch_add(1, Ordering::AcqRel);
        let slot = index % self.capacity;

        unsafe {
            let cell = self.slots[slot].get();
            (*cell).write(value);
        }

        // Advance tail_start up to our own index + 1, one writer at a time, so
        // a concurrent reader never sees tail_start pass a slot still being
        // written by a slower producer that reserved an earlier index.
        while self
            .tail_start
            .compare_exchange_weak(index, index + 1, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            std::hint::spin_loop();
        }

        // If this push wrapped past the consumer's head, the entry it just
        // clobbered is gone; drag head forward so get_all doesn't read stale
        // (or moved-out) memory for a slot that's been overwritten since.
        let oldest_live = (index + 1).saturating_sub(self.capacity);
        let mut head = self.head.load(Ordering::Acquire);
        while head < oldest_live {
            match self
                .head
                .compare_exchange_weak(head, oldest_live, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => break,
                Err(actual) => head = actual,
            }
        }
    }

    /// Drains every currently-available entry, oldest first. Requires `&mut
    /// self`, which is what enforces the single-consumer half of the
    /// contract: the borrow checker rejects a second concurrent drain.
    pub fn get_all(&mut self) -> Vec<T> {
        let end = self.tail_start.load(Ordering::Acquire);
        let start = self.head.load(Ordering::Acquire).max(end.saturating_sub(self.capacity));

        let mut out = Vec::with_capacity(end.saturating_sub(start));
        for index in start..end {
            let slot = index % self.capacity;
            unsafe {
                let cell = self.slots[slot].get();
                out.push((*cell).assume_init_read());
            }
        }

        self.head.store(end, Ordering::Release);
        out
    }

    /// Number of entries currently available to [`RingQueue::get_all`].
    pub fn len(&self) -> usize {
        let end = self.tail_start.load(Ordering::Acquire);
        let start = self.head.load(Ordering::Acquire);
        end.saturating_sub(start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Drop for RingQueue<T> {
    fn drop(&mut self) {
        // Everything at or after head and before tail_start is initialized and
        // not yet read out; everything else is either never written or
        // already moved out by a prior get_all.
        let end = self.tail_start.load(Ordering::Acquire);
        let start = self.head.load(Ordering::Acquire);
        for index in start..end {
            let slot = index % self.capacity;
            unsafe {
                let cell = self.slots[slot].get();
                std::ptr::drop_in_place((*cell).as_mut_ptr());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn push_then_drain_preserves_order_under_capacity() {
        let mut queue = RingQueue::new(8);
        for value in 0..5 {
            queue.push(value);
        }
        assert_eq!(queue.get_all(), vec![0, 1, 2, 3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn overflow_overwrites_oldest_entries() {
        let mut queue = RingQueue::new(4);
        for value in 0..10 {
            queue.push(value);
        }
        assert_eq!(queue.get_all(), vec![6, 7, 8, 9]);
    }

    #[test]
    fn partial_drains_resume_from_where_they_left_off() {
        let mut queue = RingQueue::new(4);
        queue.push(1);
        queue.push(2);
        assert_eq!(queue.get_all(), vec![1, 2]);
        queue.push(3);
        assert_eq!(queue.get_all(), vec![3]);
    }

    #[test]
    fn many_producers_push_every_value_exactly_once_within_capacity() {
        let queue = Arc::new(RingQueue::new(4096));
        let threads_number = std::env::var("HCVD_RQ_TEST_THREADS_NUMBER")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(20usize);
        let per_thread = 100usize;

        thread::scope(|scope| {
            for t in 0..threads_number {
                let queue = queue.clone();
                scope.spawn(move || {
                    for i in 0..per_thread {
                        queue.push(t * per_thread + i);
                    }
                });
            }
        });

        let mut queue = Arc::try_unwrap(queue).unwrap_or_else(|_| panic!("threads still hold a reference"));
        let drained = queue.get_all();
        assert_eq!(drained.len(), threads_number * per_thread);
    }

    #[test]
    #[should_panic(expected = "non-zero")]
    fn zero_capacity_panics() {
        let _: RingQueue<i32> = RingQueue::new(0);
    }
}
