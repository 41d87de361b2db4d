// Thumbnail adapter - single-frame grabs through the encoder

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::domain::errors::*;
use crate::engine::command::to_thumbnail_command;
use crate::ports::*;
use crate::utils::cmdline::split_command_line;
use crate::utils::path::{resolve_non_duplicate, CacheDirs};
use crate::utils::process::configure_headless;

/// Writes `<cache>/thumbnails/<stem>.jpg`, never overwriting an older grab
pub struct FfmpegThumbnailExtractor {
    program: PathBuf,
    cache: CacheDirs,
}

impl FfmpegThumbnailExtractor {
    pub fn new(program: impl Into<PathBuf>, cache: CacheDirs) -> Self {
        Self {
            program: program.into(),
            cache,
        }
    }

    fn target_path(&self, file_path: &Path) -> DomainResult<PathBuf> {
        let dir = self.cache.thumbnails();
        std::fs::create_dir_all(&dir)?;

        let stem = file_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| "thumbnail".to_string());
        let target = resolve_non_duplicate(&dir.join(format!("{}.jpg", stem)));

        if target.is_absolute() {
            Ok(target)
        } else {
            Ok(std::env::current_dir()?.join(target))
        }
    }
}

#[async_trait]
impl ThumbnailExtractor for FfmpegThumbnailExtractor {
    async fn extract(&self, file_path: &Path, position: Duration) -> DomainResult<PathBuf> {
        let target = self.target_path(file_path)?;
        let command = to_thumbnail_command(file_path, position, &target);

        let mut cmd = Command::new(&self.program);
        cmd.args(split_command_line(&command));
        configure_headless(&mut cmd);

        debug!("Extracting thumbnail: {}", command);
        let status = cmd.status().await.map_err(|source| DomainError::Launch {
            program: self.program.display().to_string(),
            source,
        })?;

        if !status.success() {
            warn!("Thumbnail grab for {} exited with {}", file_path.display(), status);
        }

        Ok(target)
    }
}
