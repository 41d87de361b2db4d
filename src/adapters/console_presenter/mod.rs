//! Console presenter: command review, progress and removal prompts on a terminal

use std::io::{self, Write};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::domain::model::*;
use crate::engine::progress::{
    ConsoleProgressCallback, JsonProgressCallback, ProgressTracker, RunProgress,
};
use crate::ports::*;

/// What one line of review input asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewAnswer {
    Accept,
    Abort,
    /// Replace command N (1-based) with the next line
    Edit(usize),
    Invalid,
}

impl ReviewAnswer {
    pub fn parse(line: &str, command_count: usize) -> Self {
        let line = line.trim().to_lowercase();
        match line.as_str() {
            "y" | "yes" => ReviewAnswer::Accept,
            "n" | "no" | "q" => ReviewAnswer::Abort,
            _ => match line.strip_prefix('e').map(str::trim).map(str::parse::<usize>) {
                Some(Ok(n)) if (1..=command_count).contains(&n) => ReviewAnswer::Edit(n),
                _ => ReviewAnswer::Invalid,
            },
        }
    }
}

/// Terminal-backed [`BatchPresenter`]
pub struct ConsolePresenter {
    assume_yes: bool,
    review: bool,
    tracker: ProgressTracker,
}

impl ConsolePresenter {
    /// `assume_yes` answers every prompt with yes; `review` shows commands
    /// before running them; `json` switches progress output to JSON lines.
    pub fn new(assume_yes: bool, review: bool, json: bool, verbose: bool) -> Self {
        let tracker = ProgressTracker::new("batch");
        if json {
            tracker.add_callback(Arc::new(JsonProgressCallback));
        } else {
            tracker.add_callback(Arc::new(ConsoleProgressCallback::new(verbose)));
        }

        Self {
            assume_yes,
            review,
            tracker,
        }
    }

    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }
}

/// Print `prompt` and read one line; `None` on end of input
async fn prompt_line(prompt: String) -> Option<String> {
    tokio::task::spawn_blocking(move || {
        print!("{}", prompt);
        let _ = io::stdout().flush();

        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(&['\r', '\n'][..]).to_string()),
        }
    })
    .await
    .ok()
    .flatten()
}

fn print_commands(commands: &[CommandInfo]) {
    for (index, command) in commands.iter().enumerate() {
        println!("{:>3}: {}", index + 1, command.command);
    }
}

#[async_trait]
impl BatchPresenter for ConsolePresenter {
    async fn review_commands(&self, mut commands: Vec<CommandInfo>) -> Option<Vec<CommandInfo>> {
        if !self.review {
            return Some(commands);
        }

        print_commands(&commands);
        if self.assume_yes {
            return Some(commands);
        }

        loop {
            let line = prompt_line("Run these commands? [y]es / [n]o / e N to edit: ".to_string()).await?;
            match ReviewAnswer::parse(&line, commands.len()) {
                ReviewAnswer::Accept => return Some(commands),
                ReviewAnswer::Abort => {
                    info!("Run aborted at review");
                    return None;
                }
                ReviewAnswer::Edit(n) => {
                    let edited = prompt_line(format!("New arguments for {}: ", n)).await?;
                    if !edited.trim().is_empty() {
                        commands[n - 1].command = edited.trim().to_string();
                        debug!("Command {} edited", n);
                    }
                    print_commands(&commands);
                }
                ReviewAnswer::Invalid => println!("Answer y, n, or e followed by a command number"),
            }
        }
    }

    async fn on_run_start(&self, operation: &str, total: usize) {
        info!("Starting {} of {} item(s)", operation, total);
        self.tracker.start(total);
    }

    async fn on_progress(&self, progress: RunProgress) {
        self.tracker.record(&progress);
    }

    async fn on_run_finish(&self, completed: usize, total: usize, cancelled: bool) {
        debug!("Run finished: {}/{} (cancelled: {})", completed, total, cancelled);
        self.tracker.finish(cancelled);
    }

    async fn confirm_removal(&self, completed: &[EditItem]) -> bool {
        if completed.is_empty() {
            return false;
        }
        if self.assume_yes {
            return true;
        }

        let prompt = format!(
            "Remove {} completed item(s) from the list? [y/N]: ",
            completed.len()
        );
        matches!(
            prompt_line(prompt).await.map(|answer| answer.trim().to_lowercase()),
            Some(answer) if answer == "y" || answer == "yes"
        )
    }
}
