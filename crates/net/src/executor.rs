//! Deferred work for the main (simulation) thread.
//!
//! Network threads hold a [`MainThreadHandle`] and submit closures; the thread
//! that owns the world drains them with [`MainThreadExecutor::run_pending`] once
//! per tick. Submission never blocks: a full queue rejects the work.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError, TrySendError};
use std::sync::Arc;
use thiserror::Error;
use tracing::trace;

/// Default queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// A unit of work run against the world on the main thread.
pub type Task<W> = Box<dyn FnOnce(&mut W) + Send + 'static>;

/// Why a task could not be queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The queue is at capacity.
    #[error("main thread queue is full")]
    QueueFull,
    /// The executor has been dropped.
    #[error("main thread executor is gone")]
    Closed,
}

/// Sending half, cloneable across network threads.
pub struct MainThreadHandle<W> {
    tx: SyncSender<Task<W>>,
    depth: Arc<AtomicUsize>,
}

impl<W> Clone for MainThreadHandle<W> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            depth: Arc::clone(&self.depth),
        }
    }
}

impl<W> MainThreadHandle<W> {
    /// Queue `work` without blocking.
    pub fn submit<F>(&self, work: F) -> Result<(), SubmitError>
    where
        F: FnOnce(&mut W) + Send + 'static,
    {
        // Counted before the send; the receiver may take the task at once.
        self.depth.fetch_add(1, Ordering::AcqRel);
        let rejected = match self.tx.try_send(Box::new(work)) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Full(_)) => SubmitError::QueueFull,
            Err(TrySendError::Disconnected(_)) => SubmitError::Closed,
        };
        self.depth.fetch_sub(1, Ordering::AcqRel);
        Err(rejected)
    }
}

/// Receiving half, owned by the main thread.
pub struct MainThreadExecutor<W> {
    rx: Receiver<Task<W>>,
    depth: Arc<AtomicUsize>,
}

impl<W> MainThreadExecutor<W> {
    /// Create an executor with a bounded queue of `capacity` tasks.
    pub fn new(capacity: usize) -> (Self, MainThreadHandle<W>) {
        let (tx, rx) = mpsc::sync_channel(capacity.max(1));
        let depth = Arc::new(AtomicUsize::new(0));
        (
            Self {
                rx,
                depth: Arc::clone(&depth),
            },
            MainThreadHandle { tx, depth },
        )
    }

    /// Tasks queued and not yet run.
    pub fn pending(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }

    /// Run up to `budget` queued tasks in submission order.
    ///
    /// Returns the number of tasks run.
    pub fn run_pending(&self, world: &mut W, budget: usize) -> usize {
        let mut ran = 0;
        while ran < budget {
            match self.rx.try_recv() {
                Ok(task) => {
                    self.depth.fetch_sub(1, Ordering::AcqRel);
                    task(world);
                    ran += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        if ran > 0 {
            trace!(ran, "Ran deferred tasks");
        }
        ran
    }

    /// Run every queued task.
    pub fn run_all(&self, world: &mut W) -> usize {
        self.run_pending(world, usize::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn tasks_run_in_submission_order_within_budget() {
        let (executor, handle) = MainThreadExecutor::<Vec<u32>>::new(8);
        for i in 0..5 {
            handle.submit(move |log: &mut Vec<u32>| log.push(i)).unwrap();
        }

        assert_eq!(executor.pending(), 5);

        let mut log = Vec::new();
        assert_eq!(executor.run_pending(&mut log, 3), 3);
        assert_eq!(log, vec![0, 1, 2]);
        assert_eq!(executor.pending(), 2);
        assert_eq!(executor.run_all(&mut log), 2);
        assert_eq!(executor.pending(), 0);
        assert_eq!(log, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn full_queue_rejects_without_blocking() {
        let (executor, handle) = MainThreadExecutor::<u32>::new(1);
        handle.submit(|n: &mut u32| *n += 1).unwrap();
        assert_eq!(handle.submit(|n: &mut u32| *n += 1), Err(SubmitError::QueueFull));

        let mut n = 0;
        executor.run_all(&mut n);
        assert_eq!(n, 1);
    }

    #[test]
    fn depth_settles_at_zero_under_concurrent_submits() {
        for _ in 0..50 {
            let (executor, handle) = MainThreadExecutor::<u64>::new(64);
            let producers: Vec<_> = (0..4)
                .map(|_| {
                    let handle = handle.clone();
                    thread::spawn(move || {
                        let mut accepted = 0u64;
                        for _ in 0..500 {
                            if handle.submit(|n: &mut u64| *n += 1).is_ok() {
                                accepted += 1;
                            }
                        }
                        accepted
                    })
                })
                .collect();

            let mut total = 0u64;
            while !producers.iter().all(|p| p.is_finished()) {
                executor.run_all(&mut total);
            }
            let accepted: u64 = producers.into_iter().map(|p| p.join().unwrap()).sum();
            executor.run_all(&mut total);

            assert_eq!(total, accepted);
            assert_eq!(executor.pending(), 0);
        }
    }

    #[test]
    fn rejected_submits_do_not_count_as_pending() {
        let (executor, handle) = MainThreadExecutor::<u32>::new(1);
        handle.submit(|_: &mut u32| {}).unwrap();
        assert!(handle.submit(|_: &mut u32| {}).is_err());
        assert_eq!(executor.pending(), 1);
        drop(executor);
        assert_eq!(handle.submit(|_: &mut u32| {}), Err(SubmitError::Closed));
    }

    #[test]
    fn dropped_executor_closes_handle() {
        let (executor, handle) = MainThreadExecutor::<u32>::new(4);
        drop(executor);
        assert_eq!(handle.submit(|_: &mut u32| {}), Err(SubmitError::Closed));
    }

    #[test]
    fn work_from_other_threads_runs_on_owner() {
        let (executor, handle) = MainThreadExecutor::<Vec<thread::ThreadId>>::new(16);
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let handle = handle.clone();
                thread::spawn(move || {
                    handle
                        .submit(|ids: &mut Vec<thread::ThreadId>| ids.push(thread::current().id()))
                        .unwrap();
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let mut ids = Vec::new();
        assert_eq!(executor.run_all(&mut ids), 4);
        assert!(ids.iter().all(|id| *id == thread::current().id()));
    }
}
