//! Bounded worker pool: documents are processed as independent tasks and
//! their results stream back to a single consumer on the calling thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::sync_channel;
use std::sync::Arc;

use tracing::debug;

use longsumm_core::{Error, Result};

/// Results buffered per worker before workers block on the consumer.
const RESULTS_PER_WORKER: usize = 4;

/// Fixed-size pool of preprocessing workers.
///
/// A panic inside a task aborts the process: panics are reserved for broken
/// record invariants.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Result<Self> {
        let workers = workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("prepro-{}", i))
            .build()
            .map_err(|e| Error::Internal(format!("failed to start worker pool: {}", e)))?;
        debug!("Worker pool started with {} threads", workers);
        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `task` on every job and hand each result to `sink` as it arrives.
    ///
    /// Results arrive in completion order. If `sink` fails, jobs that have not
    /// started are skipped, results of jobs already running are discarded, and
    /// the error is returned once every task has finished.
    pub fn run<J, R, F, S>(&self, jobs: Vec<J>, task: F, mut sink: S) -> Result<usize>
    where
        J: Send + 'static,
        R: Send + 'static,
        F: Fn(J) -> R + Send + Sync + 'static,
        S: FnMut(R) -> Result<()>,
    {
        let (tx, rx) = sync_channel(self.workers * RESULTS_PER_WORKER);
        let task = Arc::new(task);
        let cancelled = Arc::new(AtomicBool::new(false));

        for job in jobs {
            let tx = tx.clone();
            let task = Arc::clone(&task);
            let cancelled = Arc::clone(&cancelled);
            self.pool.spawn(move || {
                if cancelled.load(Ordering::Acquire) {
                    return;
                }
                let _ = tx.send(task(job));
            });
        }
        drop(tx);

        let mut received = 0usize;
        let mut failure = None;
        // Drained to the end so no task outlives the call.
        for result in rx {
            if failure.is_some() {
                continue;
            }
            received += 1;
            if let Err(e) = sink(result) {
                cancelled.store(true, Ordering::Release);
                failure = Some(e);
            }
        }
        match failure {
            Some(e) => {
                debug!("Worker pool run cancelled after {} results", received);
                Err(e)
            }
            None => Ok(received),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_results_collected() {
        let pool = WorkerPool::new(3).unwrap();
        let mut seen = Vec::new();
        let count = pool
            .run((0..50u64).collect(), |x| x * x, |r| {
                seen.push(r);
                Ok(())
            })
            .unwrap();

        assert_eq!(count, 50);
        seen.sort_unstable();
        let expected: Vec<u64> = (0..50u64).map(|x| x * x).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_sink_error_stops_run() {
        let pool = WorkerPool::new(2).unwrap();
        let mut calls = 0;
        let result = pool.run((0..20u32).collect(), |x| x, |_| {
            calls += 1;
            Err(Error::Internal("disk full".into()))
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_sink_error_skips_pending_jobs() {
        use std::sync::atomic::AtomicUsize;
        use std::time::Duration;

        let pool = WorkerPool::new(1).unwrap();
        let executed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&executed);
        let result = pool.run(
            (0..50u32).collect(),
            move |x| {
                counter.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(5));
                x
            },
            |_| Err(Error::Internal("disk full".into())),
        );
        assert!(result.is_err());

        let after_return = executed.load(Ordering::SeqCst);
        assert!(after_return < 50, "ran {} of 50 jobs", after_return);
        // Nothing is still running once the error is returned.
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(executed.load(Ordering::SeqCst), after_return);
    }

    #[test]
    fn test_zero_workers_clamped() {
        let pool = WorkerPool::new(0).unwrap();
        assert_eq!(pool.workers(), 1);
        let count = pool.run(Vec::<u8>::new(), |x| x, |_| Ok(())).unwrap();
        assert_eq!(count, 0);
    }
}
