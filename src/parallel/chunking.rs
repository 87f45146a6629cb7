use crate::config::RunConfig;
use crate::utils::progress::ProgressTracker;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::sync::Mutex;
use std::time::Duration;

/// Configuration for fanning work out over the worker pool
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Number of worker threads
    pub num_workers: usize,
    /// Minimum number of partitions a worker takes at once
    pub chunk_size: usize,
    /// Whether to log progress as partitions finish
    pub show_progress: bool,
}

impl From<&RunConfig> for ChunkingConfig {
    fn from(config: &RunConfig) -> Self {
        Self {
            num_workers: config.num_workers.max(1),
            chunk_size: config.chunk_size.max(1),
            show_progress: true,
        }
    }
}

/// Splits `items` into `n` contiguous partitions whose lengths differ by at
/// most one; the longer partitions come first. `n == 0` is treated as 1.
pub fn split_into_partitions<T>(items: &[T], n: usize) -> Vec<&[T]> {
    let n = n.max(1);
    let base = items.len() / n;
    let extra = items.len() % n;

    let mut partitions = Vec::with_capacity(n);
    let mut start = 0;
    for i in 0..n {
        let len = base + usize::from(i < extra);
        partitions.push(&items[start..start + len]);
        start += len;
    }
    debug!("Split {} items into {} partitions", items.len(), partitions.len());
    partitions
}

/// Counts one finished partition. A lock poisoned by a panicking worker is
/// recovered so progress keeps being reported.
fn report_progress(tracker: &Mutex<ProgressTracker>) {
    let mut tracker = tracker.lock().unwrap_or_else(|poisoned| {
        warn!("Progress tracker lock was poisoned; continuing");
        poisoned.into_inner()
    });
    if tracker.increment() {
        info!("{}", tracker.status());
    }
}

/// Maps `process_fn` over `partitions` on a dedicated pool of
/// `config.num_workers` threads.
///
/// Results come back in submission order. The first error aborts the run.
pub fn process_partitions_parallel<P, F, T>(
    partitions: Vec<P>,
    config: &ChunkingConfig,
    process_fn: F,
) -> Result<Vec<T>>
where
    P: Send,
    F: Fn(P) -> Result<T> + Send + Sync,
    T: Send,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.num_workers.max(1))
        .build()
        .context("Failed to build worker pool")?;

    let num_partitions = partitions.len();
    debug!(
        "Processing {} partitions using {} workers (chunk size {})",
        num_partitions, config.num_workers, config.chunk_size
    );

    let progress = config.show_progress.then(|| {
        Mutex::new(
            ProgressTracker::new(num_partitions, "Partition processing")
                .with_update_interval(Duration::from_millis(500)),
        )
    });

    let results: Result<Vec<T>> = pool.install(|| {
        partitions
            .into_par_iter()
            .with_min_len(config.chunk_size.max(1))
            .map(|partition| {
                let result = process_fn(partition);
                if let Some(tracker) = &progress {
                    report_progress(tracker);
                }
                result
            })
            .collect()
    });

    results
}
