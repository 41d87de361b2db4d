//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

use crate::domain::model::{EncodeSettings, ImageSettings};

/// Working-set input shared by every batch command
#[derive(Args, Debug, Clone)]
pub struct ManifestArgs {
    /// Batch manifest (.toml, .yaml or .json)
    #[arg(short, long)]
    pub manifest: PathBuf,

    /// Write the working set back to the manifest after the run
    #[arg(long)]
    pub save_manifest: bool,

    /// Output directory (remembered for later runs)
    #[arg(short, long, env = "CLIPBATCH_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,
}

/// Per-invocation overrides of the saved encode settings
#[derive(Args, Debug, Clone, Default)]
pub struct EncodeOverrides {
    /// Output width; 0 or negative derives it from the aspect ratio
    #[arg(long, allow_negative_numbers = true)]
    pub width: Option<i32>,

    /// Output height; 0 or negative derives it from the aspect ratio
    #[arg(long, allow_negative_numbers = true)]
    pub height: Option<i32>,

    /// Output frame rate; 0 or negative keeps the source rate
    #[arg(long, allow_negative_numbers = true)]
    pub fps: Option<f64>,

    /// Video codec passed to the encoder (blank keeps its default)
    #[arg(long)]
    pub codec: Option<String>,

    /// Output extension, e.g. .mp4
    #[arg(long)]
    pub ext: Option<String>,

    /// Drop audio
    #[arg(long, conflicts_with = "audio")]
    pub no_audio: bool,

    /// Keep audio
    #[arg(long)]
    pub audio: bool,
}

impl EncodeOverrides {
    pub fn apply(&self, settings: &mut EncodeSettings) {
        if let Some(width) = self.width {
            settings.target_width = width;
        }
        if let Some(height) = self.height {
            settings.target_height = height;
        }
        if let Some(fps) = self.fps {
            settings.frame_rate = fps;
        }
        if let Some(codec) = &self.codec {
            settings.codec = codec.clone();
        }
        if let Some(ext) = &self.ext {
            settings.output_extension = if ext.starts_with('.') {
                ext.clone()
            } else {
                format!(".{}", ext)
            };
        }
        if self.no_audio {
            settings.audio_disabled = true;
        }
        if self.audio {
            settings.audio_disabled = false;
        }
    }
}

/// Per-invocation overrides of the saved image settings
#[derive(Args, Debug, Clone, Default)]
pub struct ImageOverrides {
    /// Image format, e.g. png or jpg
    #[arg(long)]
    pub format: Option<String>,

    /// Frames sampled per second; below 1 is ignored
    #[arg(long, allow_negative_numbers = true)]
    pub image_fps: Option<i32>,

    /// Maximum number of frames; below 1 means no limit
    #[arg(long, allow_negative_numbers = true)]
    pub frames: Option<i32>,

    /// Encoder quality scale, lower is better; negative leaves it unset
    #[arg(long, allow_negative_numbers = true)]
    pub quality: Option<i32>,
}

impl ImageOverrides {
    pub fn apply(&self, settings: &mut ImageSettings) {
        if let Some(format) = &self.format {
            settings.image_format = format.trim_start_matches('.').to_string();
        }
        if let Some(fps) = self.image_fps {
            settings.frames_per_second = fps;
        }
        if let Some(frames) = self.frames {
            settings.total_frame_count = frames;
        }
        if let Some(quality) = self.quality {
            settings.quality = quality;
        }
    }
}

/// Arguments for the compress command
#[derive(Args, Debug)]
pub struct CompressArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    #[command(flatten)]
    pub encode: EncodeOverrides,
}

/// Arguments for the images command
#[derive(Args, Debug)]
pub struct ImagesArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    #[command(flatten)]
    pub image: ImageOverrides,
}

/// Arguments for the join command
#[derive(Args, Debug)]
pub struct JoinArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,
}

/// Arguments for the commands (dry run) command
#[derive(Args, Debug)]
pub struct CommandsArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    #[command(flatten)]
    pub encode: EncodeOverrides,

    #[command(flatten)]
    pub image: ImageOverrides,

    /// Show image extraction commands instead of compress commands
    #[arg(long)]
    pub images: bool,
}

/// Arguments for the probe command
#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,
}

/// Arguments for the thumbnail command
#[derive(Args, Debug)]
pub struct ThumbnailArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Position (HH:MM:SS.ms, MM:SS.ms, or seconds)
    #[arg(long, default_value = "0")]
    pub at: String,
}
