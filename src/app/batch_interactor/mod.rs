// Batch interactor - binds the working set and settings to batch runs

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{info, warn};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::WorkingSet;
use crate::engine::command::{to_compress_command, to_image_command};
use crate::engine::progress::RunProgress;
use crate::engine::runner::{BatchControl, Cancellable, ParallelCommandRunner};
use crate::engine::JoinPipeline;
use crate::ports::*;
use crate::utils::path::CacheDirs;

/// What a compress or image run did to the working set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    /// Items whose command completed, in completion order
    pub completed: Vec<EditItem>,
    /// How many of them were removed from the working set
    pub removed: usize,
    pub cancelled: bool,
    /// The run was refused at review; nothing was launched
    pub aborted: bool,
}

/// Interactor for compress, image extraction and join runs
pub struct BatchInteractor {
    encoder: PathBuf,
    parallelism: usize,
    cache: CacheDirs,
    inspector: Arc<dyn MediaInspector>,
    presenter: Arc<dyn BatchPresenter>,
    control: Mutex<Arc<BatchControl>>,
}

impl BatchInteractor {
    /// `parallelism` 0 means one process per logical CPU
    pub fn new(
        encoder: impl Into<PathBuf>,
        parallelism: usize,
        cache: CacheDirs,
        inspector: Arc<dyn MediaInspector>,
        presenter: Arc<dyn BatchPresenter>,
    ) -> Self {
        Self {
            encoder: encoder.into(),
            parallelism,
            cache,
            inspector,
            presenter,
            control: Mutex::new(Arc::new(BatchControl::new())),
        }
    }

    /// Compress commands for the selected items, outputs deduplicated
    pub fn build_compress_commands(
        &self,
        working: &WorkingSet,
        settings: &EncodeSettings,
        output_directory: &Path,
    ) -> Vec<CommandInfo> {
        working
            .selected()
            .into_iter()
            .map(|item| {
                let command = to_compress_command(&item, settings, output_directory, true);
                CommandInfo::new(item, command)
            })
            .collect()
    }

    /// Image extraction commands for the selected items
    pub fn build_image_commands(
        &self,
        working: &WorkingSet,
        settings: &ImageSettings,
        output_directory: &Path,
    ) -> Vec<CommandInfo> {
        working
            .selected()
            .into_iter()
            .map(|item| {
                let command = to_image_command(&item, settings, output_directory);
                CommandInfo::new(item, command)
            })
            .collect()
    }

    pub async fn compress(
        &self,
        working: &mut WorkingSet,
        settings: &EncodeSettings,
        output_directory: &Path,
    ) -> DomainResult<BatchOutcome> {
        let commands = self.build_compress_commands(working, settings, output_directory);
        self.run_batch("compress", working, commands, Some(output_directory))
            .await
    }

    pub async fn extract_images(
        &self,
        working: &mut WorkingSet,
        settings: &ImageSettings,
        output_directory: &Path,
    ) -> DomainResult<BatchOutcome> {
        let commands = self.build_image_commands(working, settings, output_directory);
        self.run_batch("images", working, commands, None).await
    }

    /// Join the selected items, in working-set order, into one file and
    /// append it to the working set. Returns the new item's key.
    pub async fn join(&self, working: &mut WorkingSet) -> DomainResult<Option<ItemKey>> {
        let control = self.current_control();
        let result = self.join_under(working, &control).await;
        self.reset_control();
        result
    }

    async fn join_under(
        &self,
        working: &mut WorkingSet,
        control: &Arc<BatchControl>,
    ) -> DomainResult<Option<ItemKey>> {
        let selected = working.selected();
        if selected.is_empty() {
            return Ok(None);
        }
        if control.is_cancelled() {
            info!("Join cancelled before it started");
            return Ok(None);
        }

        let total = selected.len();
        let pipeline = JoinPipeline::new(&self.encoder, self.parallelism, self.cache.clone());
        let (sender, receiver) = mpsc::unbounded_channel();

        self.presenter.on_run_start("join", total).await;
        let background = Arc::clone(control);
        let handle =
            tokio::spawn(async move { pipeline.run(&selected, &background, Some(sender)).await });
        let (joined, events) = self.forward_progress(handle, receiver).await;
        self.presenter
            .on_run_finish(events, total, control.is_cancelled())
            .await;

        let merged = match joined {
            Ok(result) => result?,
            Err(e) => {
                warn!("Join task failed: {}", e);
                None
            }
        };

        let Some(merged) = merged else {
            return Ok(None);
        };

        match self.inspector.inspect(&merged).await {
            Ok(info) => {
                let clone_index = working.next_clone_index(&merged);
                let key = working.push(EditItem::new(merged, clone_index, info));
                info!("Added joined item {}", key);
                Ok(Some(key))
            }
            Err(e) => {
                warn!("Joined file could not be added: {}", e);
                Ok(None)
            }
        }
    }

    /// Cancel the run in progress, or the next one when none has started
    /// yet (manifest probing and command review come before the run).
    /// Each run gets a new control when it ends, so a cancel never leaks
    /// past the run it reached.
    pub fn cancel(&self) {
        self.current_control().cancel();
    }

    fn current_control(&self) -> Arc<BatchControl> {
        Arc::clone(&self.control.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn reset_control(&self) {
        *self.control.lock().unwrap_or_else(PoisonError::into_inner) = Arc::new(BatchControl::new());
    }

    async fn run_batch(
        &self,
        operation: &str,
        working: &mut WorkingSet,
        commands: Vec<CommandInfo>,
        output_directory: Option<&Path>,
    ) -> DomainResult<BatchOutcome> {
        let control = self.current_control();
        let outcome = self
            .run_batch_under(operation, working, commands, output_directory, &control)
            .await;
        self.reset_control();
        outcome
    }

    async fn run_batch_under(
        &self,
        operation: &str,
        working: &mut WorkingSet,
        commands: Vec<CommandInfo>,
        output_directory: Option<&Path>,
        control: &Arc<BatchControl>,
    ) -> DomainResult<BatchOutcome> {
        let stopped = BatchOutcome {
            cancelled: true,
            ..BatchOutcome::default()
        };

        if commands.is_empty() {
            return Ok(BatchOutcome::default());
        }
        if control.is_cancelled() {
            info!("{} cancelled before review", operation);
            return Ok(stopped);
        }

        let Some(commands) = self.presenter.review_commands(commands).await else {
            return Ok(BatchOutcome {
                aborted: true,
                ..BatchOutcome::default()
            });
        };
        if control.is_cancelled() {
            info!("{} cancelled during review", operation);
            return Ok(stopped);
        }
        if commands.is_empty() {
            return Ok(BatchOutcome::default());
        }

        if let Some(directory) = output_directory {
            std::fs::create_dir_all(directory)?;
        }

        let total = commands.len();
        let (sender, receiver) = mpsc::unbounded_channel();
        let runner = Arc::new(
            ParallelCommandRunner::<EditItem>::new(&self.encoder)
                .with_parallelism(self.parallelism)
                .with_progress(sender),
        );
        // a cancel landing here has already cancelled the runner
        control.attach(runner.clone());

        self.presenter.on_run_start(operation, total).await;
        let background = Arc::clone(&runner);
        let handle = tokio::spawn(async move { background.run_parallel(commands).await });
        let (joined, _) = self.forward_progress(handle, receiver).await;
        control.detach();

        let completed = joined.unwrap_or_else(|e| {
            warn!("{} task failed: {}", operation, e);
            runner.completed()
        });
        let cancelled = control.is_cancelled();
        self.presenter
            .on_run_finish(completed.len(), total, cancelled)
            .await;

        let removed = if self.presenter.confirm_removal(&completed).await {
            working.remove_completed(&completed)
        } else {
            0
        };

        Ok(BatchOutcome {
            completed,
            removed,
            cancelled,
            aborted: false,
        })
    }

    /// Hand progress events to the presenter until `handle` finishes.
    /// Returns the task result and the number of events forwarded.
    async fn forward_progress<T>(
        &self,
        mut handle: JoinHandle<T>,
        mut receiver: mpsc::UnboundedReceiver<RunProgress>,
    ) -> (Result<T, JoinError>, usize) {
        let mut events = 0;
        let joined = loop {
            tokio::select! {
                Some(progress) = receiver.recv() => {
                    events += 1;
                    self.presenter.on_progress(progress).await;
                }
                joined = &mut handle => break joined,
            }
        };

        while let Ok(progress) = receiver.try_recv() {
            events += 1;
            self.presenter.on_progress(progress).await;
        }

        (joined, events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    struct FixedInspector;

    #[async_trait]
    impl MediaInspector for FixedInspector {
        async fn inspect(&self, _file_path: &Path) -> DomainResult<MediaInfo> {
            Ok(MediaInfo {
                duration: Duration::from_secs(5),
                width: 640,
                height: 480,
                frame_rate: 30.0,
                video_codec: "h264".to_string(),
                file_size: 10,
            })
        }
    }

    /// Presenter with scripted answers that counts what it was shown
    struct ScriptedPresenter {
        accept_review: bool,
        remove: bool,
        review_delay: Duration,
        reviews: AtomicUsize,
        progress: AtomicUsize,
    }

    impl ScriptedPresenter {
        fn new(accept_review: bool, remove: bool) -> Arc<Self> {
            Self::with_review_delay(accept_review, remove, Duration::ZERO)
        }

        /// The user takes `review_delay` to answer the review
        fn with_review_delay(accept_review: bool, remove: bool, review_delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                accept_review,
                remove,
                review_delay,
                reviews: AtomicUsize::new(0),
                progress: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl BatchPresenter for ScriptedPresenter {
        async fn review_commands(&self, commands: Vec<CommandInfo>) -> Option<Vec<CommandInfo>> {
            self.reviews.fetch_add(1, Ordering::SeqCst);
            if !self.review_delay.is_zero() {
                tokio::time::sleep(self.review_delay).await;
            }
            self.accept_review.then_some(commands)
        }

        async fn on_progress(&self, _progress: RunProgress) {
            self.progress.fetch_add(1, Ordering::SeqCst);
        }

        async fn confirm_removal(&self, _completed: &[EditItem]) -> bool {
            self.remove
        }
    }

    fn working_set(names: &[&str], selected: bool) -> WorkingSet {
        let mut working = WorkingSet::new();
        for name in names {
            let mut item = EditItem::new(
                format!("/videos/{}", name),
                0,
                MediaInfo {
                    duration: Duration::from_secs(5),
                    width: 640,
                    height: 480,
                    frame_rate: 30.0,
                    video_codec: "h264".to_string(),
                    file_size: 10,
                },
            );
            item.is_selected = selected;
            working.push(item);
        }
        working
    }

    fn interactor(encoder: &str, presenter: Arc<ScriptedPresenter>, cache: &Path) -> BatchInteractor {
        BatchInteractor::new(encoder, 2, CacheDirs::new(cache), Arc::new(FixedInspector), presenter)
    }

    #[tokio::test]
    async fn test_nothing_selected_is_a_noop() {
        let temp_dir = TempDir::new().unwrap();
        let presenter = ScriptedPresenter::new(true, true);
        let batch = interactor("/no/such/encoder", presenter.clone(), temp_dir.path());
        let mut working = working_set(&["a.mp4", "b.mp4"], false);

        let outcome = batch
            .compress(&mut working, &EncodeSettings::default(), temp_dir.path())
            .await
            .unwrap();
        assert_eq!(outcome, BatchOutcome::default());
        assert_eq!(presenter.reviews.load(Ordering::SeqCst), 0);
        assert_eq!(working.len(), 2);
    }

    #[tokio::test]
    async fn test_refused_review_aborts() {
        let temp_dir = TempDir::new().unwrap();
        let presenter = ScriptedPresenter::new(false, true);
        let batch = interactor("/no/such/encoder", presenter.clone(), temp_dir.path());
        let mut working = working_set(&["a.mp4"], true);
        let output = temp_dir.path().join("out");

        let outcome = batch
            .compress(&mut working, &EncodeSettings::default(), &output)
            .await
            .unwrap();
        assert!(outcome.aborted);
        assert!(outcome.completed.is_empty());
        assert_eq!(working.len(), 1);
        assert!(!output.exists());
    }

    #[test]
    fn test_commands_only_for_selected_items() {
        let temp_dir = TempDir::new().unwrap();
        let batch = interactor("ffmpeg", ScriptedPresenter::new(true, true), temp_dir.path());
        let mut working = working_set(&["a.mp4", "b.mp4", "c.mp4"], true);
        working.items_mut()[1].is_selected = false;

        let commands = batch.build_compress_commands(&working, &EncodeSettings::default(), Path::new("/out"));
        assert_eq!(commands.len(), 2);
        assert!(commands[0].command.contains("aC0.mp4"));
        assert!(commands[1].command.contains("cC0.mp4"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_completed_items_removed_on_confirmation() {
        let temp_dir = TempDir::new().unwrap();
        let presenter = ScriptedPresenter::new(true, true);
        // `true` accepts any arguments and exits at once
        let batch = interactor("true", presenter.clone(), temp_dir.path());
        let mut working = working_set(&["a.mp4", "b.mp4", "c.mp4"], true);
        working.items_mut()[2].is_selected = false;

        let outcome = batch
            .compress(&mut working, &EncodeSettings::default(), temp_dir.path())
            .await
            .unwrap();
        assert_eq!(outcome.completed.len(), 2);
        assert_eq!(outcome.removed, 2);
        assert!(!outcome.cancelled);
        assert_eq!(presenter.progress.load(Ordering::SeqCst), 2);
        assert_eq!(working.len(), 1);
        assert_eq!(working.items()[0].file_path(), Path::new("/videos/c.mp4"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_declined_removal_keeps_items() {
        let temp_dir = TempDir::new().unwrap();
        let presenter = ScriptedPresenter::new(true, false);
        let batch = interactor("true", presenter, temp_dir.path());
        let mut working = working_set(&["a.mp4"], true);

        let outcome = batch
            .extract_images(&mut working, &ImageSettings::default(), temp_dir.path())
            .await
            .unwrap();
        assert_eq!(outcome.completed.len(), 1);
        assert_eq!(outcome.removed, 0);
        assert_eq!(working.len(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancel_during_review_stops_the_run() {
        let temp_dir = TempDir::new().unwrap();
        let presenter = ScriptedPresenter::with_review_delay(true, true, Duration::from_millis(300));
        let batch = Arc::new(interactor("true", presenter.clone(), temp_dir.path()));
        let mut working = working_set(&["a.mp4"], true);
        let output = temp_dir.path().join("out");

        let canceller = Arc::clone(&batch);
        let cancel = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let outcome = batch
            .compress(&mut working, &EncodeSettings::default(), &output)
            .await
            .unwrap();
        cancel.await.unwrap();

        assert!(outcome.cancelled);
        assert!(outcome.completed.is_empty());
        assert_eq!(presenter.reviews.load(Ordering::SeqCst), 1);
        assert_eq!(presenter.progress.load(Ordering::SeqCst), 0);
        assert_eq!(working.len(), 1);
        assert!(!output.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancel_before_run_applies_once() {
        let temp_dir = TempDir::new().unwrap();
        let presenter = ScriptedPresenter::new(true, false);
        let batch = interactor("true", presenter.clone(), temp_dir.path());
        let mut working = working_set(&["a.mp4"], true);

        // e.g. Ctrl-C while the manifest was still being probed
        batch.cancel();
        let outcome = batch
            .compress(&mut working, &EncodeSettings::default(), temp_dir.path())
            .await
            .unwrap();
        assert!(outcome.cancelled);
        assert_eq!(presenter.reviews.load(Ordering::SeqCst), 0);

        let outcome = batch
            .compress(&mut working, &EncodeSettings::default(), temp_dir.path())
            .await
            .unwrap();
        assert!(!outcome.cancelled);
        assert_eq!(outcome.completed.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_join_launches_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let batch = interactor("/no/such/encoder", ScriptedPresenter::new(true, true), temp_dir.path());
        let mut working = working_set(&["a.mp4"], true);

        batch.cancel();
        assert!(batch.join(&mut working).await.unwrap().is_none());
        assert!(!temp_dir.path().join("join").exists());
        assert_eq!(working.len(), 1);
    }

    #[tokio::test]
    async fn test_join_without_selection() {
        let temp_dir = TempDir::new().unwrap();
        let batch = interactor("ffmpeg", ScriptedPresenter::new(true, true), temp_dir.path());
        let mut working = working_set(&["a.mp4"], false);
        assert!(batch.join(&mut working).await.unwrap().is_none());
        assert_eq!(working.len(), 1);
    }
}
