//! Batch engine: command building, parallel execution, progress and join

pub mod command;
pub mod join;
pub mod progress;
pub mod runner;

pub use join::JoinPipeline;
pub use progress::{ProgressTracker, RunProgress};
pub use runner::{BatchControl, Cancellable, ParallelCommandRunner, WorkSource};
