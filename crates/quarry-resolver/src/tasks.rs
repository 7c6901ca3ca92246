//! Bounded fan-out of independent download jobs.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;

/// Run `jobs` with at most `limit` in flight and return their outputs in job
/// order. A job that panicked or was cancelled yields `None`.
///
/// Dropping the returned future drops the `JoinSet`, which aborts every job
/// still running.
pub(crate) async fn run_bounded<T, F>(limit: usize, jobs: Vec<F>) -> Vec<Option<T>>
where
    T: Send + 'static,
    F: Future<Output = T> + Send + 'static,
{
    let mut results: Vec<Option<T>> = Vec::with_capacity(jobs.len());
    results.resize_with(jobs.len(), || None);
    if jobs.is_empty() {
        return results;
    }

    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let mut join_set = JoinSet::new();
    for (idx, job) in jobs.into_iter().enumerate() {
        let sem = semaphore.clone();
        join_set.spawn(async move {
            let _permit = sem.acquire().await;
            (idx, job.await)
        });
    }

    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((idx, value)) => results[idx] = Some(value),
            Err(e) => warn!("Download task did not complete: {e}"),
        }
    }
    results
}
