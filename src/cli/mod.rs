//! CLI module for ClipBatch
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::adapters::json_settings::{UserSetting, DEFAULT_SETTINGS_FILE};

pub mod args;
pub mod commands;

/// ClipBatch
///
/// Runs batches of ffmpeg jobs in parallel over a manifest of video files:
/// compress, extract still images, or trim and join into one file.
#[derive(Parser, Debug)]
#[command(name = "clipbatch")]
#[command(about = "ClipBatch - parallel ffmpeg batch runner for trimming, compressing and joining videos")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level (overridden by RUST_LOG)
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    /// Log output format: pretty, compact or json
    #[arg(long, default_value = "compact", global = true)]
    pub log_format: String,

    /// Settings file
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE, global = true)]
    pub settings: PathBuf,

    /// Answer yes to every prompt
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    /// Show the built commands for review before running them
    #[arg(long, global = true)]
    pub review: bool,

    /// Maximum concurrent encoder processes (0 = one per CPU)
    #[arg(short = 'j', long, env = "CLIPBATCH_JOBS", global = true)]
    pub jobs: Option<usize>,

    /// Encoder executable
    #[arg(long, env = "CLIPBATCH_ENCODER", global = true)]
    pub encoder: Option<PathBuf>,

    /// Probe executable
    #[arg(long, env = "CLIPBATCH_PROBE", global = true)]
    pub probe: Option<PathBuf>,

    /// Cache directory for thumbnails and join scratch files
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Apply the global overrides on top of the loaded settings
    pub fn apply_overrides(&self, settings: &mut UserSetting) {
        if let Some(jobs) = self.jobs {
            settings.max_parallel = jobs;
        }
        if let Some(encoder) = &self.encoder {
            settings.encoder_path = encoder.clone();
        }
        if let Some(probe) = &self.probe {
            settings.probe_path = probe.clone();
        }
        if let Some(cache_dir) = &self.cache_dir {
            settings.cache_dir = cache_dir.clone();
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compress the selected items of a manifest
    Compress(args::CompressArgs),
    /// Extract still images from the selected items
    Images(args::ImagesArgs),
    /// Trim the selected items and join them into one file
    Join(args::JoinArgs),
    /// Print the commands a run would execute, without running them
    Commands(args::CommandsArgs),
    /// Inspect video file information
    Probe(args::ProbeArgs),
    /// Extract a single frame into the thumbnail cache
    Thumbnail(args::ThumbnailArgs),
    /// Delete cached thumbnails and join scratch files
    ClearCache,
}
