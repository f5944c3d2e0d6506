//! The bounded producer/consumer ring (§4.6, §9) that hands batches of read
//! pairs from the single reader thread to the worker pool.
//!
//! The original design used a pair of cursors that were only conditionally
//! wrapped, which can desynchronize under sustained load (§9). This
//! implementation uses a pair of monotonic [`AtomicU64`] counters and always
//! indexes storage by `counter mod capacity`, so wrapping is never a distinct
//! code path.

use crate::model::read::ReadPair;
use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Condvar, Mutex,
    },
    time::Duration,
};

/// A fixed-capacity batch of read pairs, the unit of transfer across thread
/// boundaries (§3). Once placed in the ring, a pack's contents are never
/// mutated.
#[derive(Debug, Default)]
pub struct Pack {
    pub pairs: Vec<ReadPair>,
}

impl Pack {
    #[inline]
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pairs: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.pairs.len()
    }
}

/// Polling interval used for backpressure waits (§5, §9): `usleep(1000)` in
/// the original design.
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Bounded circular buffer of [`Pack`]s (§4.6). Single producer, multiple
/// consumers.
pub struct PackRingBuffer {
    capacity: usize,
    max_in_memory: u64,
    slots: Mutex<Vec<Option<Pack>>>,
    not_empty: Condvar,
    write_pos: AtomicU64,
    read_pos: AtomicU64,
    produce_finished: AtomicBool,
}

impl PackRingBuffer {
    /// Creates a new ring with the given capacity (`maxPacksInRepo`) and
    /// in-memory high-water mark (`maxPacksInMemory`).
    #[must_use]
    pub fn new(capacity: usize, max_in_memory: usize) -> Self {
        assert!(capacity > 0, "pack ring buffer capacity must be nonzero");
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            capacity,
            max_in_memory: max_in_memory as u64,
            slots: Mutex::new(slots),
            not_empty: Condvar::new(),
            write_pos: AtomicU64::new(0),
            read_pos: AtomicU64::new(0),
            produce_finished: AtomicBool::new(false),
        }
    }

    #[inline]
    fn in_flight(&self) -> u64 {
        self.write_pos.load(Ordering::Acquire) - self.read_pos.load(Ordering::Acquire)
    }

    /// Producer-side push. Blocks (via polled sleep, §5) while the ring is at
    /// its in-memory high-water mark. Never drops a pack.
    pub fn push(&self, pack: Pack) {
        loop {
            if self.in_flight() < self.max_in_memory {
                break;
            }
            std::thread::sleep(POLL_INTERVAL);
        }

        let write_pos = self.write_pos.load(Ordering::Acquire);
        let index = (write_pos % self.capacity as u64) as usize;
        {
            let mut slots = self.slots.lock().unwrap();
            slots[index] = Some(pack);
        }
        self.write_pos.store(write_pos + 1, Ordering::Release);
        self.not_empty.notify_all();
    }

    /// Marks that the producer will push no further packs. Consumers use this
    /// to know when to stop waiting on an empty ring.
    pub fn finish_producing(&self) {
        self.produce_finished.store(true, Ordering::Release);
        self.not_empty.notify_all();
    }

    /// Consumer-side pop. Returns `None` once the ring is drained and
    /// [`finish_producing`](Self::finish_producing) has been called.
    pub fn pop(&self) -> Option<Pack> {
        let mut slots = self.slots.lock().unwrap();
        loop {
            let read_pos = self.read_pos.load(Ordering::Acquire);
            let write_pos = self.write_pos.load(Ordering::Acquire);

            if read_pos < write_pos {
                let index = (read_pos % self.capacity as u64) as usize;
                let pack = slots[index].take();
                self.read_pos.store(read_pos + 1, Ordering::Release);
                return pack;
            }

            if self.produce_finished.load(Ordering::Acquire) {
                return None;
            }

            // Bounded wait so we re-check `produce_finished` even if a
            // notification is missed between the load above and the wait.
            let (guard, _timeout) = self.not_empty.wait_timeout(slots, POLL_INTERVAL).unwrap();
            slots = guard;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::read::Read;

    fn dummy_pair() -> ReadPair {
        ReadPair::new(
            Read::new("@a".into(), b"ACGT".to_vec(), b"IIII".to_vec(), None),
            Read::new("@a".into(), b"TGCA".to_vec(), b"IIII".to_vec(), None),
        )
    }

    #[test]
    fn backpressure_never_overwrites_unconsumed_pack() {
        // maxPacksInMemory = 1: the producer must block until the single
        // in-flight pack is consumed before pushing a second one.
        let ring = std::sync::Arc::new(PackRingBuffer::new(4, 1));
        let ring2 = ring.clone();

        let mut first = Pack::with_capacity(1);
        first.pairs.push(dummy_pair());
        ring.push(first);

        let handle = std::thread::spawn(move || {
            let mut second = Pack::with_capacity(1);
            second.pairs.push(dummy_pair());
            ring2.push(second);
        });

        // The push above should block until we drain one pack.
        std::thread::sleep(Duration::from_millis(20));
        let popped = ring.pop().expect("first pack must still be present");
        assert_eq!(popped.count(), 1);

        handle.join().unwrap();
        ring.finish_producing();
        let popped2 = ring.pop().expect("second pack should now be available");
        assert_eq!(popped2.count(), 1);
        assert!(ring.pop().is_none());
    }

    #[test]
    fn pop_returns_none_after_drain_and_finish() {
        let ring = PackRingBuffer::new(2, 2);
        ring.finish_producing();
        assert!(ring.pop().is_none());
    }
}
