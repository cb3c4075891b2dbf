// Bounded worker pool for tile decoding
//
// Tasks run on a dedicated rayon pool sized to the concurrency limit, so at most
// `limit` workers are ever executing. Results come back over a channel in
// completion order and are re-sorted by submission index before returning.

use std::sync::mpsc;

use crate::error::PoolError;

#[allow(unused_imports)]
use log::{debug, trace, warn};

pub struct BoundedPool {
    pool: rayon::ThreadPool,
    limit: usize,
}

impl BoundedPool {
    pub fn new(limit: usize) -> Result<Self, PoolError> {
        if limit == 0 {
            return Err(PoolError::ZeroLimit);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(limit)
            .thread_name(|i| format!("tilesheet-decode-{i}"))
            .build()?;

        debug!("Decode pool started with {} workers", limit);
        Ok(Self { pool, limit })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Runs `worker` over every task and returns one result per task, ordered by
    /// the index each task was submitted with. A failing task only fills its own
    /// slot with `Err`.
    pub fn run<I, T, E, F>(&self, tasks: Vec<(usize, I)>, worker: F) -> Vec<(usize, Result<T, E>)>
    where
        I: Send,
        T: Send,
        E: Send,
        F: Fn(I) -> Result<T, E> + Sync,
    {
        let expected = tasks.len();
        let (sender, receiver) = mpsc::channel();
        let worker = &worker;

        self.pool.scope(move |scope| {
            for (index, input) in tasks {
                let sender = sender.clone();
                scope.spawn(move |_| {
                    let result = worker(input);
                    // The receiver outlives the scope, so this cannot fail
                    let _ = sender.send((index, result));
                });
            }
        });

        let mut results: Vec<(usize, Result<T, E>)> = receiver.into_iter().collect();
        if results.len() != expected {
            warn!("Decode pool returned {} results for {} tasks", results.len(), expected);
        }
        results.sort_by_key(|(index, _)| *index);
        trace!("Decode pool finished {} tasks", results.len());
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_zero_limit_rejected() {
        assert!(matches!(BoundedPool::new(0), Err(PoolError::ZeroLimit)));
    }

    #[test]
    fn test_results_follow_submission_order() {
        let pool = BoundedPool::new(4).unwrap();
        // Earlier tasks sleep longer so they finish last
        let tasks: Vec<(usize, u64)> = (0..12).map(|i| (i, 12 - i as u64)).collect();

        let results = pool.run(tasks, |delay| -> Result<u64, ()> {
            thread::sleep(Duration::from_millis(delay * 2));
            Ok(delay)
        });

        let indices: Vec<usize> = results.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, (0..12).collect::<Vec<_>>());
        for (index, result) in &results {
            assert_eq!(*result.as_ref().unwrap(), 12 - *index as u64);
        }
    }

    #[test]
    fn test_failure_does_not_cancel_siblings() {
        let pool = BoundedPool::new(3).unwrap();
        let tasks: Vec<(usize, usize)> = (0..10).map(|i| (i, i)).collect();

        let results = pool.run(tasks, |n| if n == 4 { Err(format!("bad {n}")) } else { Ok(n * 10) });

        assert_eq!(results.len(), 10);
        assert_eq!(results[4].1, Err("bad 4".to_string()));
        let ok = results.iter().filter(|(_, r)| r.is_ok()).count();
        assert_eq!(ok, 9);
    }

    #[test]
    fn test_never_exceeds_limit() {
        const LIMIT: usize = 3;
        let pool = BoundedPool::new(LIMIT).unwrap();
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let started = AtomicUsize::new(0);

        let tasks: Vec<(usize, ())> = (0..40).map(|i| (i, ())).collect();
        let results = pool.run(tasks, |_| -> Result<(), ()> {
            started.fetch_add(1, Ordering::SeqCst);
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(3));
            active.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        });

        assert_eq!(results.len(), 40);
        assert_eq!(started.load(Ordering::SeqCst), 40);
        assert!(peak.load(Ordering::SeqCst) <= LIMIT);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn test_empty_task_list() {
        let pool = BoundedPool::new(2).unwrap();
        let results = pool.run(Vec::<(usize, u8)>::new(), |n| -> Result<u8, ()> { Ok(n) });
        assert!(results.is_empty());
        assert_eq!(pool.limit(), 2);
    }
}
