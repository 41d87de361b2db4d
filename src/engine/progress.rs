//! Progress tracking and callback system for batch runs

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Event emitted each time a command of a run completes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunProgress {
    /// Commands completed so far, this one included
    pub completed: usize,
    /// Commands submitted to the run
    pub total: usize,
    /// Display name of the source that just completed
    pub label: String,
}

impl RunProgress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.completed as f64 / self.total as f64 * 100.0).min(100.0)
        }
    }
}

/// Progress callback trait for UI integration
pub trait ProgressCallback: Send + Sync {
    /// Called when a run of `total` commands starts
    fn on_start(&self, operation: &str, total: usize);

    /// Called once per completed command
    fn on_progress(&self, progress: &RunProgress, eta: Option<Duration>);

    /// Called when the run is over, cancelled or not
    fn on_finish(&self, completed: usize, total: usize, cancelled: bool);
}

/// Progress phases
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProgressPhase {
    Idle,
    Running,
    Complete,
    Cancelled,
}

/// Snapshot of a tracked run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressInfo {
    pub phase: ProgressPhase,
    pub operation: String,
    pub completed: usize,
    pub total: usize,
    /// Progress percentage (0.0 - 100.0)
    pub percent: f64,
    pub elapsed: Duration,
    /// Estimated time remaining, from the average time per completed command
    pub eta: Option<Duration>,
}

/// Progress tracker with thread-safe updates
#[derive(Clone)]
pub struct ProgressTracker {
    inner: Arc<Mutex<ProgressTrackerInner>>,
    callbacks: Arc<Mutex<Vec<Arc<dyn ProgressCallback>>>>,
}

struct ProgressTrackerInner {
    info: ProgressInfo,
    start_time: Instant,
}

impl ProgressTracker {
    pub fn new(operation: &str) -> Self {
        let info = ProgressInfo {
            phase: ProgressPhase::Idle,
            operation: operation.to_string(),
            completed: 0,
            total: 0,
            percent: 0.0,
            elapsed: Duration::ZERO,
            eta: None,
        };

        Self {
            inner: Arc::new(Mutex::new(ProgressTrackerInner {
                info,
                start_time: Instant::now(),
            })),
            callbacks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a progress callback
    pub fn add_callback(&self, callback: Arc<dyn ProgressCallback>) {
        if let Ok(mut callbacks) = self.callbacks.lock() {
            callbacks.push(callback);
        }
    }

    /// Start a run of `total` commands
    pub fn start(&self, total: usize) {
        let operation = match self.inner.lock() {
            Ok(mut inner) => {
                inner.info.phase = ProgressPhase::Running;
                inner.info.total = total;
                inner.info.completed = 0;
                inner.info.percent = 0.0;
                inner.info.eta = None;
                inner.start_time = Instant::now();
                inner.info.operation.clone()
            }
            Err(_) => return,
        };

        self.notify_callbacks(|cb| cb.on_start(&operation, total));
    }

    /// Record one completion event
    pub fn record(&self, progress: &RunProgress) {
        let eta = match self.inner.lock() {
            Ok(mut inner) => {
                let elapsed = inner.start_time.elapsed();
                inner.info.completed = progress.completed;
                inner.info.total = progress.total;
                inner.info.percent = progress.percent();
                inner.info.elapsed = elapsed;

                // events arrive in completion order, so the average is stable enough
                inner.info.eta = if progress.completed > 0 && progress.completed < progress.total {
                    let per_command = elapsed.as_secs_f64() / progress.completed as f64;
                    let remaining = (progress.total - progress.completed) as f64;
                    Some(Duration::from_secs_f64(per_command * remaining))
                } else {
                    None
                };
                inner.info.eta
            }
            Err(_) => None,
        };

        self.notify_callbacks(|cb| cb.on_progress(progress, eta));
    }

    /// Close the run
    pub fn finish(&self, cancelled: bool) {
        let (completed, total) = match self.inner.lock() {
            Ok(mut inner) => {
                inner.info.phase = if cancelled {
                    ProgressPhase::Cancelled
                } else {
                    ProgressPhase::Complete
                };
                inner.info.elapsed = inner.start_time.elapsed();
                inner.info.eta = None;
                (inner.info.completed, inner.info.total)
            }
            Err(_) => return,
        };

        self.notify_callbacks(|cb| cb.on_finish(completed, total, cancelled));
    }

    /// Get current progress information
    pub fn get_info(&self) -> Option<ProgressInfo> {
        self.inner.lock().ok().map(|inner| inner.info.clone())
    }

    fn notify_callbacks<F>(&self, f: F)
    where
        F: Fn(&dyn ProgressCallback),
    {
        if let Ok(callbacks) = self.callbacks.lock() {
            for callback in callbacks.iter() {
                f(callback.as_ref());
            }
        }
    }
}

/// Console progress callback for CLI usage
pub struct ConsoleProgressCallback {
    verbose: bool,
}

impl ConsoleProgressCallback {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressCallback for ConsoleProgressCallback {
    fn on_start(&self, operation: &str, total: usize) {
        if self.verbose {
            println!("Starting {}: {} command(s)", operation, total);
        }
    }

    fn on_progress(&self, progress: &RunProgress, eta: Option<Duration>) {
        let bar_length = 20;
        let filled = (progress.percent() / 100.0 * bar_length as f64) as usize;
        let bar = "#".repeat(filled) + &"-".repeat(bar_length - filled);

        match eta {
            Some(eta) if self.verbose => println!(
                "[{}] {}/{} {} (about {}s left)",
                bar,
                progress.completed,
                progress.total,
                progress.label,
                eta.as_secs()
            ),
            _ => println!(
                "[{}] {}/{} {}",
                bar, progress.completed, progress.total, progress.label
            ),
        }
    }

    fn on_finish(&self, completed: usize, total: usize, cancelled: bool) {
        if cancelled {
            println!("Cancelled after {} of {} command(s)", completed, total);
        } else {
            println!("Completed {} of {} command(s)", completed, total);
        }
    }
}

/// JSON progress callback for structured output
pub struct JsonProgressCallback;

impl ProgressCallback for JsonProgressCallback {
    fn on_start(&self, operation: &str, total: usize) {
        let event = serde_json::json!({
            "event": "start",
            "operation": operation,
            "total": total,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        println!("{}", event);
    }

    fn on_progress(&self, progress: &RunProgress, eta: Option<Duration>) {
        let event = serde_json::json!({
            "event": "progress",
            "completed": progress.completed,
            "total": progress.total,
            "percent": progress.percent(),
            "label": progress.label,
            "eta_secs": eta.map(|eta| eta.as_secs_f64()),
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        println!("{}", event);
    }

    fn on_finish(&self, completed: usize, total: usize, cancelled: bool) {
        let event = serde_json::json!({
            "event": if cancelled { "cancel" } else { "complete" },
            "completed": completed,
            "total": total,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        println!("{}", event);
    }
}
