use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::{Error, Result};
use crate::priority::{Priority, Subsystem};

/// Idle duration after which a borrowed worker gives itself back to its
/// home subsystem, matching the "implicitly when idle for > T milliseconds"
/// clause of the worker-borrowing contract.
const DEFAULT_BORROW_IDLE_TIMEOUT: Duration = Duration::from_millis(500);

type Task = Box<dyn FnOnce() + Send + 'static>;

struct WorkItem {
    seq: u64,
    task: Task,
}

#[derive(Default)]
struct Queues {
    lanes: [VecDeque<WorkItem>; Priority::COUNT],
    len: usize,
}

impl Queues {
    fn push(&mut self, priority: Priority, item: WorkItem) {
        self.lanes[priority.index()].push_back(item);
        self.len += 1;
    }

    fn pop(&mut self) -> Option<WorkItem> {
        for lane in self.lanes.iter_mut().rev() {
            if let Some(item) = lane.pop_front() {
                self.len -= 1;
                return Some(item);
            }
        }
        None
    }
}

struct Inner {
    name: Subsystem,
    capacity: usize,
    queues: Mutex<Queues>,
    not_empty: Condvar,
    shutdown: Arc<AtomicBool>,
}

/// Per-subsystem configuration: worker count bounds and bounded-queue
/// capacity.
#[derive(Debug, Clone, Copy)]
pub struct SubsystemConfig {
    pub min_workers: usize,
    pub max_workers: usize,
    pub queue_capacity: usize,
}

impl Default for SubsystemConfig {
    fn default() -> Self {
        Self {
            min_workers: 1,
            max_workers: 4,
            queue_capacity: 256,
        }
    }
}

struct SubsystemHandle {
    inner: Arc<Inner>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    borrowed_out: Mutex<HashMap<Subsystem, Vec<Arc<AtomicBool>>>>,
}

/// Multi-subsystem priority worker pool: named subsystems each own a bounded
/// priority queue and a set of worker threads bound to that subsystem.
pub struct ThreadPool {
    subsystems: HashMap<Subsystem, SubsystemHandle>,
    seq: AtomicU64,
    shutdown: Arc<AtomicBool>,
}

impl ThreadPool {
    pub fn new(configs: impl IntoIterator<Item = (Subsystem, SubsystemConfig)>) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut subsystems = HashMap::new();

        for (name, config) in configs {
            let inner = Arc::new(Inner {
                name,
                capacity: config.queue_capacity,
                queues: Mutex::new(Queues::default()),
                not_empty: Condvar::new(),
                shutdown: shutdown.clone(),
            });

            let mut workers = Vec::with_capacity(config.min_workers);
            for _ in 0..config.min_workers {
                workers.push(spawn_worker(inner.clone(), None));
            }

            subsystems.insert(
                name,
                SubsystemHandle {
                    inner,
                    workers: Mutex::new(workers),
                    borrowed_out: Mutex::new(HashMap::new()),
                },
            );
        }

        Self {
            subsystems,
            seq: AtomicU64::new(0),
            shutdown,
        }
    }

    pub fn submit_work<F>(&self, subsystem: Subsystem, priority: Priority, task: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = self
            .subsystems
            .get(&subsystem)
            .ok_or(Error::UnknownSubsystem)?;

        let mut queues = handle.inner.queues.lock();
        if queues.len >= handle.inner.capacity {
            return Err(Error::QueueFull);
        }

        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        queues.push(priority, WorkItem {
            seq,
            task: Box::new(task),
        });
        drop(queues);
        handle.inner.not_empty.notify_one();
        Ok(())
    }

    /// Temporarily moves `count` extra worker threads onto `to`, bound until
    /// [`Self::release_workers`] is called or they idle out.
    pub fn request_workers(&self, from: Subsystem, to: Subsystem, count: usize) -> Result<()> {
        let to_handle = self.subsystems.get(&to).ok_or(Error::UnknownSubsystem)?;
        if !self.subsystems.contains_key(&from) {
            return Err(Error::UnknownSubsystem);
        }

        let mut borrowed = to_handle.borrowed_out.lock();
        let stop_flags = borrowed.entry(from).or_default();

        let mut workers = to_handle.workers.lock();
        for _ in 0..count {
            let stop = Arc::new(AtomicBool::new(false));
            workers.push(spawn_worker(to_handle.inner.clone(), Some(stop.clone())));
            stop_flags.push(stop);
        }

        log::debug!("borrowed {count} workers from {from:?} into {to:?}");
        Ok(())
    }

    /// Stops up to `count` workers previously borrowed by `to` from `from`.
    pub fn release_workers(&self, from: Subsystem, to: Subsystem, count: usize) -> Result<()> {
        let to_handle = self.subsystems.get(&to).ok_or(Error::UnknownSubsystem)?;
        let mut borrowed = to_handle.borrowed_out.lock();
        if let Some(stop_flags) = borrowed.get_mut(&from) {
            for stop in stop_flags.drain(..count.min(stop_flags.len())) {
                stop.store(true, Ordering::Release);
            }
            to_handle.inner.not_empty.notify_all();
        }
        Ok(())
    }

    /// Sets the shutdown flag and wakes every subsystem; workers finish
    /// their current item and then exit.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        for handle in self.subsystems.values() {
            handle.inner.shutdown.store(true, Ordering::Release);
            handle.inner.not_empty.notify_all();
        }
    }

    pub fn join(&self) {
        for handle in self.subsystems.values() {
            let mut workers = handle.workers.lock();
            for worker in workers.drain(..) {
                let _ = worker.join();
            }
        }
    }
}

fn spawn_worker(inner: Arc<Inner>, borrow_stop: Option<Arc<AtomicBool>>) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut last_activity = Instant::now();

        loop {
            if inner.shutdown.load(Ordering::Acquire) {
                break;
            }
            if let Some(stop) = &borrow_stop {
                if stop.load(Ordering::Acquire) {
                    break;
                }
            }

            let item = {
                let mut queues = inner.queues.lock();
                loop {
                    if let Some(item) = queues.pop() {
                        break Some(item);
                    }
                    if inner.shutdown.load(Ordering::Acquire) {
                        break None;
                    }
                    if let Some(stop) = &borrow_stop {
                        if stop.load(Ordering::Acquire) {
                            break None;
                        }
                        if last_activity.elapsed() >= DEFAULT_BORROW_IDLE_TIMEOUT {
                            break None;
                        }
                    }
                    let timeout = borrow_stop
                        .as_ref()
                        .map(|_| DEFAULT_BORROW_IDLE_TIMEOUT)
                        .unwrap_or(Duration::from_millis(100));
                    inner.not_empty.wait_for(&mut queues, timeout);
                }
            };

            match item {
                Some(item) => {
                    (item.task)();
                    last_activity = Instant::now();
                    let _ = item.seq;
                }
                None => break,
            }
        }

        log::trace!("worker for {:?} exiting", inner.name);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn one_of_each() -> Vec<(Subsystem, SubsystemConfig)> {
        Subsystem::ALL
            .into_iter()
            .map(|s| (s, SubsystemConfig::default()))
            .collect()
    }

    #[test]
    fn submit_and_run() {
        let pool = ThreadPool::new(one_of_each());
        let (tx, rx) = mpsc::channel();
        pool.submit_work(Subsystem::EcsUpdate, Priority::Normal, move || {
            tx.send(42).unwrap();
        })
        .unwrap();

        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), 42);
        pool.shutdown();
        pool.join();
    }

    #[test]
    fn queue_full_rejects() {
        let configs = [(
            Subsystem::Rendering,
            SubsystemConfig {
                min_workers: 0,
                max_workers: 0,
                queue_capacity: 1,
            },
        )];
        let pool = ThreadPool::new(configs);
        pool.submit_work(Subsystem::Rendering, Priority::Low, || {})
            .unwrap();
        let err = pool
            .submit_work(Subsystem::Rendering, Priority::Low, || {})
            .unwrap_err();
        assert!(matches!(err, Error::QueueFull));
        pool.shutdown();
    }

    #[test]
    fn unknown_subsystem_errors() {
        let pool = ThreadPool::new(one_of_each());
        let err = pool
            .submit_work(Subsystem::Custom("nope"), Priority::Low, || {})
            .unwrap_err();
        assert!(matches!(err, Error::UnknownSubsystem));
        pool.shutdown();
    }
}
