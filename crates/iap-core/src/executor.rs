//! Bounded worker pool for per-point grid evaluation.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;

use tracing::debug;

use crate::error::{IapError, Result};

/// Pool size for `tasks` items: available parallelism, capped by `max_workers`
/// and the task count, never below one.
pub fn worker_count(tasks: usize, max_workers: Option<usize>) -> usize {
    let available = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let cap = max_workers.unwrap_or(available).max(1);
    available.min(cap).min(tasks).max(1)
}

/// Run `task` once per item on a scoped pool of `workers` threads.
///
/// Workers pull the next index from a shared cursor. Returns once every
/// worker has joined. The first error stops further dispatch and is returned;
/// items already in flight still finish.
pub fn run_parallel<T, F>(items: &[T], workers: usize, task: F) -> Result<()>
where
    T: Sync,
    F: Fn(&T) -> Result<()> + Sync,
{
    if items.is_empty() {
        return Ok(());
    }
    let workers = workers.clamp(1, items.len());
    let cursor = AtomicUsize::new(0);
    let abort = AtomicBool::new(false);
    let first_error: Mutex<Option<IapError>> = Mutex::new(None);

    let panicked = thread::scope(|s| {
        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                let (cursor, abort, first_error, task) = (&cursor, &abort, &first_error, &task);
                s.spawn(move || {
                    let mut done = 0usize;
                    while !abort.load(Ordering::Acquire) {
                        let index = cursor.fetch_add(1, Ordering::AcqRel);
                        let Some(item) = items.get(index) else {
                            break;
                        };
                        if let Err(err) = task(item) {
                            abort.store(true, Ordering::Release);
                            if let Ok(mut slot) = first_error.lock() {
                                slot.get_or_insert(err);
                            }
                            break;
                        }
                        done += 1;
                    }
                    debug!(worker, done, "grid worker finished");
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join())
            .filter(|joined| joined.is_err())
            .count()
    });

    if let Some(err) = first_error.into_inner().ok().flatten() {
        return Err(err);
    }
    if panicked > 0 {
        return Err(IapError::WorkerPanicked);
    }
    Ok(())
}
