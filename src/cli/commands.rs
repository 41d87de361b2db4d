//! Command implementations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::adapters::json_settings::UserSetting;
use crate::adapters::manifest::Manifest;
use crate::app::{AppContainer, BatchOutcome};
use crate::cli::args::{
    CommandsArgs, CompressArgs, ImagesArgs, JoinArgs, ManifestArgs, ProbeArgs, ThumbnailArgs,
};
use crate::cli::Commands;
use crate::domain::model::MediaInfo;
use crate::domain::rules::WorkingSet;
use crate::utils::time::{format_timestamp, parse_timestamp};
use crate::utils::Utils;

/// Run one subcommand. `settings` may be updated and is saved by the caller.
pub async fn dispatch(
    command: Commands,
    settings: &mut UserSetting,
    container: &dyn AppContainer,
) -> Result<()> {
    match command {
        Commands::Compress(args) => compress(args, settings, container).await,
        Commands::Images(args) => images(args, settings, container).await,
        Commands::Join(args) => join(args, settings, container).await,
        Commands::Commands(args) => commands(args, settings, container).await,
        Commands::Probe(args) => probe(args, container).await,
        Commands::Thumbnail(args) => thumbnail(args, container).await,
        Commands::ClearCache => clear_cache(container),
    }
}

/// Execute the compress command
pub async fn compress(
    args: CompressArgs,
    settings: &mut UserSetting,
    container: &dyn AppContainer,
) -> Result<()> {
    args.encode.apply(&mut settings.encode);
    let output_directory = resolve_output_directory(&args.manifest, settings);
    let mut working = load_working_set(&args.manifest, container).await?;

    let outcome = container
        .batch_interactor()
        .compress(&mut working, &settings.encode, &output_directory)
        .await
        .context("Compress run failed")?;

    report("compress", &outcome);
    finish_manifest(&args.manifest, &working)
}

/// Execute the images command
pub async fn images(
    args: ImagesArgs,
    settings: &mut UserSetting,
    container: &dyn AppContainer,
) -> Result<()> {
    args.image.apply(&mut settings.image);
    let output_directory = resolve_output_directory(&args.manifest, settings);
    let mut working = load_working_set(&args.manifest, container).await?;

    let outcome = container
        .batch_interactor()
        .extract_images(&mut working, &settings.image, &output_directory)
        .await
        .context("Image extraction failed")?;

    report("images", &outcome);
    finish_manifest(&args.manifest, &working)
}

/// Execute the join command
pub async fn join(args: JoinArgs, settings: &mut UserSetting, container: &dyn AppContainer) -> Result<()> {
    resolve_output_directory(&args.manifest, settings);
    let mut working = load_working_set(&args.manifest, container).await?;

    match container
        .batch_interactor()
        .join(&mut working)
        .await
        .context("Join failed")?
    {
        Some(key) => println!("{}", key.file_path.display()),
        None => info!("Nothing joined"),
    }

    finish_manifest(&args.manifest, &working)
}

/// Execute the commands (dry run) command
pub async fn commands(
    args: CommandsArgs,
    settings: &mut UserSetting,
    container: &dyn AppContainer,
) -> Result<()> {
    let output_directory = resolve_output_directory(&args.manifest, settings);
    let working = load_working_set(&args.manifest, container).await?;
    let interactor = container.batch_interactor();

    let built = if args.images {
        args.image.apply(&mut settings.image);
        interactor.build_image_commands(&working, &settings.image, &output_directory)
    } else {
        args.encode.apply(&mut settings.encode);
        interactor.build_compress_commands(&working, &settings.encode, &output_directory)
    };

    for command in &built {
        println!("{} {}", settings.encoder_path.display(), command.command);
    }
    info!("{} command(s) for {} item(s)", built.len(), working.len());
    Ok(())
}

/// Execute the probe command
pub async fn probe(args: ProbeArgs, container: &dyn AppContainer) -> Result<()> {
    let info = container
        .media_inspector()
        .inspect(&args.input)
        .await
        .with_context(|| format!("Failed to inspect {}", args.input.display()))?;

    let json = serde_json::to_string_pretty(&media_info_json(&args.input, &info))
        .context("Failed to serialize media info to JSON")?;
    println!("{}", json);
    Ok(())
}

/// Execute the thumbnail command
pub async fn thumbnail(args: ThumbnailArgs, container: &dyn AppContainer) -> Result<()> {
    let position = parse_timestamp(&args.at)
        .map_err(|e| anyhow::anyhow!("Invalid position '{}': {}", args.at, e))?;

    let path = container
        .thumbnail_extractor()
        .extract(&args.input, position)
        .await
        .with_context(|| format!("Failed to extract a frame from {}", args.input.display()))?;
    println!("{}", path.display());
    Ok(())
}

/// Execute the clear-cache command
pub fn clear_cache(container: &dyn AppContainer) -> Result<()> {
    let removed = container
        .cache_dirs()
        .clear()
        .context("Failed to clear cache")?;
    println!("Removed {} cached file(s)", removed);
    Ok(())
}

/// CLI/env output directory wins and is remembered; otherwise the saved one
fn resolve_output_directory(args: &ManifestArgs, settings: &mut UserSetting) -> PathBuf {
    if let Some(dir) = &args.output_dir {
        settings.output_directory = dir.clone();
    }
    settings.effective_output_directory()
}

async fn load_working_set(args: &ManifestArgs, container: &dyn AppContainer) -> Result<WorkingSet> {
    let manifest = Manifest::load(&args.manifest)
        .with_context(|| format!("Failed to load manifest {}", args.manifest.display()))?;
    let base_dir = args
        .manifest
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let inspector = container.media_inspector();
    let entries = manifest.items.len();
    let working = manifest.into_working_set(inspector.as_ref(), base_dir).await;
    info!("Loaded {} of {} manifest item(s)", working.len(), entries);
    Ok(working)
}

fn finish_manifest(args: &ManifestArgs, working: &WorkingSet) -> Result<()> {
    if args.save_manifest {
        Manifest::from_working_set(working)
            .save(&args.manifest)
            .with_context(|| format!("Failed to save manifest {}", args.manifest.display()))?;
    }
    Ok(())
}

fn report(operation: &str, outcome: &BatchOutcome) {
    if outcome.aborted {
        println!("{}: aborted at review", operation);
    } else if outcome.cancelled {
        println!(
            "{}: cancelled, {} item(s) completed",
            operation,
            outcome.completed.len()
        );
    } else {
        println!(
            "{}: {} item(s) completed, {} removed from the list",
            operation,
            outcome.completed.len(),
            outcome.removed
        );
    }
}

fn media_info_json(path: &Path, info: &MediaInfo) -> serde_json::Value {
    serde_json::json!({
        "file": path.display().to_string(),
        "duration": format_timestamp(info.duration),
        "duration_secs": info.duration.as_secs_f64(),
        "width": info.width,
        "height": info.height,
        "aspect_ratio": info.aspect_ratio(),
        "frame_rate": info.frame_rate,
        "video_codec": info.video_codec,
        "file_size": info.file_size,
        "file_size_human": Utils::format_file_size(info.file_size),
    })
}
