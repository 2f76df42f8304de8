//! Bounded worker pool shared by sweep and permutation batches.
//!
//! Each batch builds a private rayon pool (never the global one) so the
//! caller's worker count is honored exactly. Workers share the bar series and
//! simulation by reference and never lock.

use std::sync::atomic::{AtomicBool, Ordering};

use barlab_core::config::ConfigError;
use barlab_core::engine::SimulationError;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use thiserror::Error;

/// Errors that abort a whole batch before (or instead of) running it.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("reference run failed: {0}")]
    Reference(#[from] SimulationError),
    #[error("failed to build worker pool: {0}")]
    Pool(#[from] ThreadPoolBuildError),
}

/// Build a pool with `workers` threads; 0 means one per available core.
pub fn build_pool(workers: usize) -> Result<ThreadPool, ThreadPoolBuildError> {
    ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("barlab-worker-{i}"))
        .build()
}

/// Cooperative cancellation check, made between runs.
pub(crate) fn is_cancelled(cancel: Option<&AtomicBool>) -> bool {
    cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_worker_count() {
        let pool = build_pool(3).unwrap();
        assert_eq!(pool.current_num_threads(), 3);
    }

    #[test]
    fn zero_uses_all_cores() {
        let pool = build_pool(0).unwrap();
        assert!(pool.current_num_threads() >= 1);
    }

    #[test]
    fn cancellation_flag() {
        let flag = AtomicBool::new(false);
        assert!(!is_cancelled(None));
        assert!(!is_cancelled(Some(&flag)));
        flag.store(true, Ordering::Relaxed);
        assert!(is_cancelled(Some(&flag)));
    }
}
