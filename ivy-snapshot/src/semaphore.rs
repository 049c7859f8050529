use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// Wait timeout used by interruptible waits, per the concurrency model's
/// "bounded by a timeout + flag check (100 ms)" rule so neither thread can
/// deadlock on shutdown.
const WAIT_TIMEOUT: Duration = Duration::from_millis(100);

/// A counting semaphore whose blocking wait is interruptible by a shared
/// shutdown flag within [`WAIT_TIMEOUT`].
pub(crate) struct Semaphore {
    count: Mutex<usize>,
    cond: Condvar,
}

impl Semaphore {
    pub(crate) fn new(initial: usize) -> Self {
        Self {
            count: Mutex::new(initial),
            cond: Condvar::new(),
        }
    }

    pub(crate) fn post(&self) {
        let mut count = self.count.lock();
        *count += 1;
        self.cond.notify_one();
    }

    /// Blocks until a permit is available or `shutdown` becomes true.
    /// Returns `true` if a permit was acquired, `false` on shutdown.
    pub(crate) fn wait(&self, shutdown: &AtomicBool) -> bool {
        let mut count = self.count.lock();
        loop {
            if *count > 0 {
                *count -= 1;
                return true;
            }
            if shutdown.load(Ordering::Acquire) {
                return false;
            }
            self.cond.wait_for(&mut count, WAIT_TIMEOUT);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_then_wait_succeeds_immediately() {
        let sem = Semaphore::new(0);
        sem.post();
        let shutdown = AtomicBool::new(false);
        assert!(sem.wait(&shutdown));
    }

    #[test]
    fn wait_returns_false_on_shutdown() {
        let sem = Semaphore::new(0);
        let shutdown = AtomicBool::new(true);
        assert!(!sem.wait(&shutdown));
    }
}
