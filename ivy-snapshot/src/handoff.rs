use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::semaphore::Semaphore;
use crate::snapshot::Snapshot;

/// Double-buffered hand-off between one simulation thread (producer) and
/// one render thread (consumer). `write_index` tracks which of the two
/// slots the simulation is currently building; the render thread always
/// reads the other one.
///
/// Safety: the two semaphores enforce that the producer and consumer never
/// access the same slot concurrently — `acquire_write` cannot return until
/// the previous reader has called `release_read`, and `acquire_read` cannot
/// return until the producer has called `publish_write`. That protocol is
/// the sole reason `Sync` is sound here; nothing else serializes access to
/// the `UnsafeCell`s.
pub struct Handoff {
    slots: [UnsafeCell<Snapshot>; 2],
    write_index: AtomicU8,
    consumed: Semaphore,
    ready: Semaphore,
    shutdown: AtomicBool,
}

unsafe impl Sync for Handoff {}

impl Handoff {
    pub fn new() -> Self {
        Self {
            slots: [UnsafeCell::new(Snapshot::new()), UnsafeCell::new(Snapshot::new())],
            write_index: AtomicU8::new(0),
            // Starts at 1 so the first `acquire_write` does not block.
            consumed: Semaphore::new(1),
            ready: Semaphore::new(0),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Sets the shutdown flag and wakes both waiters so a blocked simulation
    /// or render thread observes it within the semaphore's wait bound.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.consumed.post();
        self.ready.post();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Producer step 1-2: waits for the previous snapshot to be consumed,
    /// then returns the slot to build the next one into. `None` means
    /// shutdown was requested while waiting.
    pub fn acquire_write(&self) -> Option<&mut Snapshot> {
        if !self.consumed.wait(&self.shutdown) {
            return None;
        }
        let w = self.write_index.load(Ordering::Relaxed) as usize;
        // Safety: see struct-level comment.
        Some(unsafe { &mut *self.slots[w].get() })
    }

    /// Producer step 3-4: flips `write_index` with release ordering and
    /// signals the render thread that a new snapshot is ready.
    pub fn publish_write(&self) {
        let w = self.write_index.load(Ordering::Relaxed);
        self.write_index.store(1 - w, Ordering::Release);
        self.ready.post();
    }

    /// Consumer step 1-3: waits for a published snapshot, then returns the
    /// slot the render thread may borrow for the full frame. `None` means
    /// shutdown was requested while waiting.
    pub fn acquire_read(&self) -> Option<&Snapshot> {
        if !self.ready.wait(&self.shutdown) {
            return None;
        }
        let r = 1 - self.write_index.load(Ordering::Acquire);
        // Safety: see struct-level comment.
        Some(unsafe { &*self.slots[r as usize].get() })
    }

    /// Consumer step 4: unblocks the simulation thread for its next tick.
    pub fn release_read(&self) {
        self.consumed.post();
    }
}

impl Default for Handoff {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn single_threaded_round_trip() {
        let handoff = Handoff::new();

        {
            let snap = handoff.acquire_write().unwrap();
            snap.generation = 1;
        }
        handoff.publish_write();

        let generation = {
            let snap = handoff.acquire_read().unwrap();
            snap.generation
        };
        assert_eq!(generation, 1);
        handoff.release_read();
    }

    #[test]
    fn generation_never_observed_decreasing() {
        let handoff = Arc::new(Handoff::new());
        let producer = {
            let handoff = handoff.clone();
            thread::spawn(move || {
                for gen in 1..=50u64 {
                    let snap = handoff.acquire_write().unwrap();
                    snap.generation = gen;
                    handoff.publish_write();
                }
            })
        };

        let mut last = 0u64;
        for _ in 0..50 {
            let observed = handoff.acquire_read().unwrap().generation;
            assert!(observed >= last);
            last = observed;
            handoff.release_read();
        }

        producer.join().unwrap();
    }

    #[test]
    fn shutdown_unblocks_waiters() {
        let handoff = Arc::new(Handoff::new());
        // Drain the initial "consumed" permit so a further acquire_write
        // would otherwise block.
        let _first = handoff.acquire_write().unwrap();
        handoff.publish_write();
        let _first_read = handoff.acquire_read().unwrap();
        // consumed permit not released: next acquire_write would block.

        let handoff2 = handoff.clone();
        let waiter = thread::spawn(move || handoff2.acquire_write().is_none());

        thread::sleep(std::time::Duration::from_millis(10));
        handoff.request_shutdown();
        assert!(waiter.join().unwrap());
    }
}
