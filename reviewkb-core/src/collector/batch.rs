//! Bounded-parallel execution with input-ordered results

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::{Error, Result};

/// Run `f` on every item with at most `parallel` calls in flight
///
/// Each item runs as its own task. Results are returned in input order
/// regardless of completion order; a task that panics yields an error in
/// its slot.
pub async fn run_bounded<T, R, F, Fut>(items: Vec<T>, parallel: usize, f: F) -> Vec<Result<R>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(parallel.max(1)));
    let f = Arc::new(f);

    let handles: Vec<_> = items
        .into_iter()
        .map(|item| {
            let semaphore = semaphore.clone();
            let f = f.clone();
            tokio::spawn(async move {
                // The semaphore is never closed
                let _permit = semaphore.acquire_owned().await.ok();
                f(item).await
            })
        })
        .collect();

    // Awaiting in spawn order fills each slot by input position
    let mut results = Vec::with_capacity(handles.len());
    for (index, handle) in handles.into_iter().enumerate() {
        results.push(
            handle
                .await
                .map_err(|e| Error::Other(format!("task {index} failed: {e}"))),
        );
    }
    results
}
