//! Parallel execution of encoder commands with cooperative cancellation
//!
//! Each worker owns its child and awaits its exit. The runner's live table
//! holds a kill switch per running child, so `cancel` can reach every one
//! of them from any thread. A worker whose switch fires kills its child and
//! records nothing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::process::Command;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::domain::errors::DomainError;
use crate::domain::model::{CommandInfo, EditItem};
use crate::engine::progress::RunProgress;
use crate::utils::cmdline::split_command_line;
use crate::utils::process::configure_headless;

/// Anything that can stop its outstanding work on request
pub trait Cancellable: Send + Sync {
    fn cancel(&self);
}

/// A source a command is run for
pub trait WorkSource: Clone + Send + Sync + 'static {
    /// Short name used in progress events and logs
    fn label(&self) -> String;
}

impl WorkSource for EditItem {
    fn label(&self) -> String {
        let name = self
            .file_path()
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        format!("{} #{}", name, self.clone_index())
    }
}

impl WorkSource for PathBuf {
    fn label(&self) -> String {
        self.display().to_string()
    }
}

struct RunnerShared<S> {
    /// Kill switches of the running children, by worker id
    live: HashMap<u64, oneshot::Sender<()>>,
    completed: Vec<S>,
}

/// Runs a batch of commands, at most `parallelism` at a time
pub struct ParallelCommandRunner<S> {
    program: PathBuf,
    parallelism: usize,
    cancelled: AtomicBool,
    next_id: AtomicU64,
    shared: Mutex<RunnerShared<S>>,
    progress: Option<mpsc::UnboundedSender<RunProgress>>,
}

impl<S> ParallelCommandRunner<S> {
    /// Runner launching `program` for every command without its own override
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            parallelism: num_cpus::get().max(1),
            cancelled: AtomicBool::new(false),
            next_id: AtomicU64::new(0),
            shared: Mutex::new(RunnerShared {
                live: HashMap::new(),
                completed: Vec::new(),
            }),
            progress: None,
        }
    }

    /// Cap concurrent processes; 0 means one per logical CPU
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = if parallelism == 0 {
            num_cpus::get().max(1)
        } else {
            parallelism
        };
        self
    }

    /// Deliver a [`RunProgress`] for every completion
    pub fn with_progress(mut self, sender: mpsc::UnboundedSender<RunProgress>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Number of processes currently running
    pub fn live_count(&self) -> usize {
        self.lock_shared().live.len()
    }

    /// Stop the run: nothing new starts, running processes are killed and
    /// will not count as completed. Safe to call repeatedly.
    pub fn cancel(&self) {
        let first = !self.cancelled.swap(true, Ordering::SeqCst);
        let killed = self.kill_live();
        if first {
            info!("Run cancelled, {} running process(es) killed", killed);
        }
    }

    fn kill_live(&self) -> usize {
        let mut shared = self.lock_shared();
        let killed = shared.live.len();
        for (id, kill) in shared.live.drain() {
            if kill.send(()).is_err() {
                debug!("Worker {} already finished", id);
            }
        }
        killed
    }

    fn lock_shared(&self) -> MutexGuard<'_, RunnerShared<S>> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: WorkSource> ParallelCommandRunner<S> {
    /// Sources whose process exited on its own before any cancellation
    pub fn completed(&self) -> Vec<S> {
        self.lock_shared().completed.clone()
    }

    /// Run every command and wait for all of them to finish or be cancelled.
    ///
    /// A command that cannot be launched is logged and skipped. Exit codes
    /// are logged but do not decide completion. Returns the completed
    /// sources in completion order.
    pub async fn run_parallel(self: &Arc<Self>, work: Vec<CommandInfo<S>>) -> Vec<S> {
        let total = work.len();
        info!(
            "Running {} command(s), up to {} at a time",
            total, self.parallelism
        );

        let permits = Arc::new(Semaphore::new(self.parallelism));
        let mut tasks = JoinSet::new();

        for item in work {
            let runner = Arc::clone(self);
            let permits = Arc::clone(&permits);
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            tasks.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return;
                };
                runner.run_one(id, item, total).await;
            });
        }

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                warn!("Worker task failed: {}", e);
            }
        }

        let completed = self.completed();
        info!("{} of {} command(s) completed", completed.len(), total);
        completed
    }

    async fn run_one(&self, id: u64, item: CommandInfo<S>, total: usize) {
        if self.is_cancelled() {
            return;
        }

        let label = item.source.label();
        let program = item.program.clone().unwrap_or_else(|| self.program.clone());
        let mut cmd = Command::new(&program);
        cmd.args(split_command_line(&item.command));
        configure_headless(&mut cmd);

        debug!("Launching {} {}", program.display(), item.command);
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(source) => {
                let error = DomainError::Launch {
                    program: program.display().to_string(),
                    source,
                };
                warn!("Skipping {}: {}", label, error);
                return;
            }
        };

        let (kill, killed) = oneshot::channel();
        {
            let mut shared = self.lock_shared();
            // cancel may have drained the table between our check and the spawn
            if self.is_cancelled() {
                let _ = child.start_kill();
                return;
            }
            shared.live.insert(id, kill);
        }

        let status = tokio::select! {
            status = child.wait() => status,
            _ = killed => {
                if let Err(e) = child.kill().await {
                    debug!("{} was already gone: {}", label, e);
                }
                debug!("{} was killed", label);
                return;
            }
        };

        let status = {
            let mut shared = self.lock_shared();
            // a missing switch means cancel claimed this child first
            if shared.live.remove(&id).is_none() || self.is_cancelled() {
                return;
            }
            let status = match status {
                Ok(status) => status,
                Err(e) => {
                    warn!("Lost track of {}: {}", label, e);
                    return;
                }
            };

            shared.completed.push(item.source.clone());
            let completed = shared.completed.len();
            if let Some(sender) = &self.progress {
                // the receiver may be gone; progress is best effort
                let _ = sender.send(RunProgress {
                    completed,
                    total,
                    label: label.clone(),
                });
            }
            status
        };

        if status.success() {
            debug!("{} finished", label);
        } else {
            warn!("{} exited with {}", label, status);
        }
    }
}

impl<S: Send> Cancellable for ParallelCommandRunner<S> {
    fn cancel(&self) {
        ParallelCommandRunner::cancel(self);
    }
}

impl<S> Drop for ParallelCommandRunner<S> {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.kill_live();
    }
}

/// Cancellation scope for one user-level operation.
///
/// An operation may go through several runners in sequence; each is
/// attached while it runs. Once cancelled, a control stays cancelled and
/// cancels anything attached to it later.
#[derive(Default)]
pub struct BatchControl {
    cancelled: AtomicBool,
    active: Mutex<Option<Arc<dyn Cancellable>>>,
}

impl BatchControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Make `target` the work a cancel reaches. Returns false, after
    /// cancelling `target`, if this control was already cancelled.
    pub fn attach(&self, target: Arc<dyn Cancellable>) -> bool {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_cancelled() {
            target.cancel();
            return false;
        }
        *active = Some(target);
        true
    }

    pub fn detach(&self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

impl Cancellable for BatchControl {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(target) = active.as_ref() {
            target.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    struct CountingTarget(AtomicUsize);

    impl Cancellable for CountingTarget {
        fn cancel(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn shell(source: &str, script: &str) -> CommandInfo<PathBuf> {
        CommandInfo::new(PathBuf::from(source), format!("-c \"{}\"", script))
    }

    #[test]
    fn test_zero_parallelism_means_cpu_count() {
        let runner: ParallelCommandRunner<PathBuf> =
            ParallelCommandRunner::new("ffmpeg").with_parallelism(0);
        assert_eq!(runner.parallelism(), num_cpus::get().max(1));

        let runner: ParallelCommandRunner<PathBuf> =
            ParallelCommandRunner::new("ffmpeg").with_parallelism(3);
        assert_eq!(runner.parallelism(), 3);
    }

    #[test]
    fn test_edit_item_label() {
        use crate::domain::model::MediaInfo;
        let info = MediaInfo {
            duration: Duration::from_secs(1),
            width: 2,
            height: 2,
            frame_rate: 1.0,
            video_codec: String::new(),
            file_size: 0,
        };
        let item = EditItem::new("/videos/a.mp4", 2, info);
        assert_eq!(item.label(), "a.mp4 #2");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_every_command() {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let runner = Arc::new(
            ParallelCommandRunner::new("sh")
                .with_parallelism(2)
                .with_progress(sender),
        );

        let work = vec![
            shell("a", "exit 0"),
            shell("b", "exit 0"),
            shell("c", "exit 3"),
        ];
        let mut completed = runner.run_parallel(work).await;
        completed.sort();
        assert_eq!(
            completed,
            vec![PathBuf::from("a"), PathBuf::from("b"), PathBuf::from("c")]
        );

        let mut counts = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            assert_eq!(event.total, 3);
            counts.push(event.completed);
        }
        assert_eq!(counts, vec![1, 2, 3]);
        assert_eq!(runner.live_count(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_launch_failure_is_skipped() {
        let runner = Arc::new(ParallelCommandRunner::new("sh"));
        let work = vec![
            shell("ok", "exit 0"),
            CommandInfo::with_program(
                PathBuf::from("broken"),
                "/definitely/not/an/encoder",
                "-y",
            ),
        ];

        let completed = runner.run_parallel(work).await;
        assert_eq!(completed, vec![PathBuf::from("ok")]);
    }

    #[tokio::test]
    async fn test_empty_run() {
        let runner: Arc<ParallelCommandRunner<PathBuf>> =
            Arc::new(ParallelCommandRunner::new("ffmpeg"));
        assert!(runner.run_parallel(Vec::new()).await.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancel_before_run_starts_nothing() {
        let runner = Arc::new(ParallelCommandRunner::new("sh"));
        runner.cancel();
        let completed = runner.run_parallel(vec![shell("a", "exit 0")]).await;
        assert!(completed.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancel_kills_running_processes() {
        let runner = Arc::new(ParallelCommandRunner::new("sh").with_parallelism(4));
        let work = vec![shell("a", "sleep 30"), shell("b", "sleep 30")];

        let background = Arc::clone(&runner);
        let handle = tokio::spawn(async move { background.run_parallel(work).await });

        let started = tokio::time::timeout(Duration::from_secs(10), async {
            while runner.live_count() < 2 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(started.is_ok());

        runner.cancel();
        assert_eq!(runner.live_count(), 0);
        runner.cancel();
        assert!(runner.is_cancelled());

        let completed = tokio::time::timeout(Duration::from_secs(10), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(completed.is_empty());
    }

    #[test]
    fn test_batch_control_forwards_cancel() {
        let control = BatchControl::new();
        let target = Arc::new(CountingTarget(AtomicUsize::new(0)));
        assert!(control.attach(target.clone()));

        control.cancel();
        assert!(control.is_cancelled());
        assert_eq!(target.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_batch_control_cancels_late_attach() {
        let control = BatchControl::new();
        control.cancel();

        let target = Arc::new(CountingTarget(AtomicUsize::new(0)));
        assert!(!control.attach(target.clone()));
        assert_eq!(target.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_batch_control_detach() {
        let control = BatchControl::new();
        let target = Arc::new(CountingTarget(AtomicUsize::new(0)));
        control.attach(target.clone());
        control.detach();

        control.cancel();
        assert_eq!(target.0.load(Ordering::SeqCst), 0);
    }
}
