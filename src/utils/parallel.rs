//! Parallel processing utilities

use crate::error::{CeterisError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Configuration for parallel processing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    /// Evaluate independent tasks on a worker pool
    pub enabled: bool,
    /// Number of threads (None = rayon's global pool)
    pub n_threads: Option<usize>,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            n_threads: None,
        }
    }
}

impl ParallelConfig {
    /// Create a new parallel configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequential evaluation on the calling thread
    pub fn sequential() -> Self {
        Self {
            enabled: false,
            n_threads: None,
        }
    }

    /// Set number of threads
    pub fn with_threads(mut self, n: usize) -> Self {
        self.n_threads = Some(n.max(1));
        self
    }

    /// Get the number of threads to use
    pub fn num_threads(&self) -> usize {
        if !self.enabled {
            return 1;
        }
        self.n_threads.unwrap_or_else(rayon::current_num_threads)
    }
}

/// Order-preserving map, parallel when the configuration allows it
pub fn parallel_map<T, U, F>(items: Vec<T>, config: &ParallelConfig, f: F) -> Result<Vec<U>>
where
    T: Send + Sync,
    U: Send,
    F: Fn(T) -> U + Send + Sync,
{
    if !config.enabled || items.len() < 2 {
        return Ok(items.into_iter().map(f).collect());
    }

    match config.n_threads {
        None => Ok(items.into_par_iter().map(f).collect()),
        Some(n) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| CeterisError::ConfigurationError(format!("thread pool: {}", e)))?;
            Ok(pool.install(|| items.into_par_iter().map(f).collect()))
        }
    }
}
