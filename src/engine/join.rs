//! Trim-then-concatenate pipeline
//!
//! Phase 1 re-encodes every item, trimmed, into the join scratch directory.
//! Phase 2 concatenates those intermediates with the concat demuxer. Phase 2
//! does not check that phase 1 produced every file it was asked for.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::domain::errors::DomainResult;
use crate::domain::model::{CommandInfo, EditItem, EncodeSettings};
use crate::engine::command::{output_path, to_compress_command, to_concat_command};
use crate::engine::progress::RunProgress;
use crate::engine::runner::{BatchControl, ParallelCommandRunner};
use crate::utils::path::CacheDirs;

/// Two-phase join over a fixed encoder and cache location
#[derive(Debug, Clone)]
pub struct JoinPipeline {
    encoder: PathBuf,
    parallelism: usize,
    cache: CacheDirs,
    settings: EncodeSettings,
}

impl JoinPipeline {
    pub fn new(encoder: impl Into<PathBuf>, parallelism: usize, cache: CacheDirs) -> Self {
        Self {
            encoder: encoder.into(),
            parallelism,
            cache,
            settings: EncodeSettings::join_intermediate(),
        }
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.cache.join()
    }

    /// Phase 1 commands, one per item, never deduplicated
    pub fn intermediate_commands(&self, items: &[EditItem]) -> Vec<CommandInfo> {
        let scratch = self.scratch_dir();
        items
            .iter()
            .map(|item| {
                let command = to_compress_command(item, &self.settings, &scratch, false);
                CommandInfo::new(item.clone(), command)
            })
            .collect()
    }

    /// Where phase 1 writes each item, in item order
    pub fn intermediate_paths(&self, items: &[EditItem]) -> Vec<PathBuf> {
        let scratch = self.scratch_dir();
        items
            .iter()
            .map(|item| output_path(item, &scratch, &self.settings.output_extension))
            .collect()
    }

    /// Run both phases. Returns the merged file, or `None` when there was
    /// nothing to join or the run was cancelled.
    pub async fn run(
        &self,
        items: &[EditItem],
        control: &BatchControl,
        progress: Option<mpsc::UnboundedSender<RunProgress>>,
    ) -> DomainResult<Option<PathBuf>> {
        if items.is_empty() {
            return Ok(None);
        }

        let scratch = self.scratch_dir();
        fs::create_dir_all(&scratch)?;
        info!("Joining {} item(s) via {}", items.len(), scratch.display());

        let mut trim_runner: ParallelCommandRunner<EditItem> =
            ParallelCommandRunner::new(&self.encoder).with_parallelism(self.parallelism);
        if let Some(sender) = progress {
            trim_runner = trim_runner.with_progress(sender);
        }
        let trim_runner = Arc::new(trim_runner);
        if !control.attach(trim_runner.clone()) {
            return Ok(None);
        }
        trim_runner.run_parallel(self.intermediate_commands(items)).await;
        control.detach();

        if control.is_cancelled() {
            info!("Join cancelled during trimming");
            return Ok(None);
        }

        let intermediates = self.intermediate_paths(items);
        for missing in intermediates.iter().filter(|path| !path.exists()) {
            warn!("Intermediate {} is missing; concatenating anyway", missing.display());
        }

        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S%3f").to_string();
        let list_file = scratch.join(format!("join_{}.txt", stamp));
        write_concat_list(&list_file, &intermediates)?;

        let merged = scratch.join(format!("joined_{}{}", stamp, self.settings.output_extension));
        let concat_runner =
            Arc::new(ParallelCommandRunner::<PathBuf>::new(&self.encoder).with_parallelism(1));
        if !control.attach(concat_runner.clone()) {
            return Ok(None);
        }
        concat_runner
            .run_parallel(vec![CommandInfo::new(
                merged.clone(),
                to_concat_command(&list_file, &merged),
            )])
            .await;
        control.detach();

        if control.is_cancelled() {
            info!("Join cancelled during concatenation");
            return Ok(None);
        }

        info!("Joined into {}", merged.display());
        Ok(Some(merged))
    }
}

/// Write a concat demuxer list. Entries are file names relative to the
/// list, which the demuxer resolves against the list's own directory.
pub fn write_concat_list(list_file: &Path, files: &[PathBuf]) -> DomainResult<()> {
    let mut contents = String::new();
    for file in files {
        let name = file
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        contents.push_str(&format!("file '{}'\n", name.replace('\'', r"'\''")));
    }
    fs::write(list_file, contents)?;
    Ok(())
}
