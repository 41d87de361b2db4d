//! ClipBatch Library
//!
//! Parallel orchestration of an external encoder (ffmpeg) over a working set
//! of video files: command building, bounded parallel execution with
//! cancellation and progress, and a trim-then-join pipeline.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod domain;
pub mod engine;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use domain::errors::{DomainError, DomainResult};
pub use domain::model::{CommandInfo, EditItem, EncodeSettings, ImageSettings, MediaInfo};
pub use domain::rules::WorkingSet;
pub use engine::{BatchControl, Cancellable, ParallelCommandRunner, RunProgress};
