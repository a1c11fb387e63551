//! Utility functions and types

mod parallel;

pub use parallel::{parallel_map, ParallelConfig};
