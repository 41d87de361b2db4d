//! ClipBatch
//!
//! Runs ffmpeg over a manifest of video files, several processes at a time.
//!
//! # Usage
//!
//! ```bash
//! clipbatch compress --manifest clips.toml --codec h264 --height 720
//! clipbatch images --manifest clips.toml --image-fps 2 --format jpg
//! clipbatch join --manifest clips.toml --save-manifest
//! clipbatch commands --manifest clips.toml
//! clipbatch probe --input video.mov
//! ```

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use clipbatch::adapters::{ConsolePresenter, JsonSettingsStore};
use clipbatch::app::{AppContainer, DefaultAppContainer};
use clipbatch::cli::{commands, Cli, Commands};
use clipbatch::utils::logging::{LogFormat, LogLevel, LoggingConfig};

/// Main entry point for the ClipBatch CLI application
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let logging = LoggingConfig {
        level: cli.log_level.parse::<LogLevel>()?,
        format: cli.log_format.parse::<LogFormat>()?,
        target: false,
    };
    logging.init();

    let store = JsonSettingsStore::new(&cli.settings);
    let mut settings = store.load();
    cli.apply_overrides(&mut settings);

    let verbose = matches!(logging.level, LogLevel::Debug | LogLevel::Trace);
    let presenter = Arc::new(ConsolePresenter::new(
        cli.yes,
        cli.review,
        logging.format == LogFormat::Json,
        verbose,
    ));
    let container = DefaultAppContainer::new(&settings, presenter);

    if settings.clear_cache_on_start && !matches!(cli.command, Commands::ClearCache) {
        if let Err(e) = container.cache_dirs().clear() {
            warn!("Could not clear cache: {}", e);
        }
    }

    let interactor = container.batch_interactor();
    // every Ctrl-C cancels whichever run is current at that moment
    let ctrl_c = tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling");
            interactor.cancel();
        }
    });

    let result = commands::dispatch(cli.command, &mut settings, &container).await;
    ctrl_c.abort();

    store.save(&settings);
    result
}
