// Ports - Interface definitions (contracts)

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::engine::progress::RunProgress;

/// Port for media file probing
#[async_trait]
pub trait MediaInspector: Send + Sync {
    /// Probe a video file. Fails with `UnsupportedInput` for unrecognised
    /// extensions and `NoVideoStream` when the container has no video.
    async fn inspect(&self, file_path: &Path) -> DomainResult<MediaInfo>;
}

/// Port for single-frame extraction
#[async_trait]
pub trait ThumbnailExtractor: Send + Sync {
    /// Grab the frame at `position` and return where it was written
    async fn extract(&self, file_path: &Path, position: Duration) -> DomainResult<PathBuf>;
}

/// Port for the user-facing side of a batch run
#[async_trait]
pub trait BatchPresenter: Send + Sync {
    /// Show the built commands for review. `None` aborts the run;
    /// otherwise the returned, possibly edited, commands are run.
    async fn review_commands(&self, commands: Vec<CommandInfo>) -> Option<Vec<CommandInfo>>;

    /// A run of `total` commands is about to start
    async fn on_run_start(&self, _operation: &str, _total: usize) {}

    /// One call per completed command
    async fn on_progress(&self, progress: RunProgress);

    /// The run is over; `cancelled` when it was stopped early
    async fn on_run_finish(&self, _completed: usize, _total: usize, _cancelled: bool) {}

    /// Ask whether completed items should leave the working set
    async fn confirm_removal(&self, completed: &[EditItem]) -> bool;
}
