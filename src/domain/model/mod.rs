// Domain models - Core types and data structures

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};
use crate::utils::time::format_timestamp;

/// Probe result for a source file. Captured once when the item is created.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub duration: Duration,
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    pub video_codec: String,
    pub file_size: u64,
}

impl MediaInfo {
    /// Get aspect ratio, 0 when the height is unknown
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            0.0
        } else {
            self.width as f64 / self.height as f64
        }
    }
}

/// Trim window. `None` on either side means "from the start" / "to the end".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trimming {
    start_point: Option<Duration>,
    end_point: Option<Duration>,
}

impl Trimming {
    /// Create a trim window, rejecting `start >= end` when both are set
    pub fn new(start_point: Option<Duration>, end_point: Option<Duration>) -> DomainResult<Self> {
        Self::check(start_point, end_point)?;
        Ok(Self {
            start_point,
            end_point,
        })
    }

    /// Trim window covering the whole source
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn start_point(&self) -> Option<Duration> {
        self.start_point
    }

    pub fn end_point(&self) -> Option<Duration> {
        self.end_point
    }

    pub fn set_start_point(&mut self, start_point: Option<Duration>) -> DomainResult<()> {
        Self::check(start_point, self.end_point)?;
        self.start_point = start_point;
        Ok(())
    }

    pub fn set_end_point(&mut self, end_point: Option<Duration>) -> DomainResult<()> {
        Self::check(self.start_point, end_point)?;
        self.end_point = end_point;
        Ok(())
    }

    /// Length of the output once trimmed against a source of `original` length
    pub fn effective_duration(&self, original: Duration) -> Duration {
        let start = self.start_point.unwrap_or(Duration::ZERO);
        let end = self.end_point.unwrap_or(original);
        end.saturating_sub(start)
    }

    fn check(start: Option<Duration>, end: Option<Duration>) -> DomainResult<()> {
        match (start, end) {
            (Some(start), Some(end)) if start >= end => Err(DomainError::InvalidTrimming {
                start: format_timestamp(start),
                end: format_timestamp(end),
            }),
            _ => Ok(()),
        }
    }
}

/// Crop rectangle in source pixel coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClipRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ClipRect {
    /// The "no crop" sentinel
    pub const EMPTY: ClipRect = ClipRect {
        x: 0.0,
        y: 0.0,
        width: 0.0,
        height: 0.0,
    };

    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A rectangle with no area selects nothing and means "do not crop"
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Pull the rectangle inside a `source_width` x `source_height` frame.
    /// Offsets are floored at zero, sizes are cut to what remains of the frame.
    pub fn clamp_to(&self, source_width: f64, source_height: f64) -> ClipRect {
        let x = self.x.max(0.0);
        let y = self.y.max(0.0);
        ClipRect {
            x,
            y,
            width: self.width.min(source_width - x),
            height: self.height.min(source_height - y),
        }
    }
}

/// Output rotation baked into the pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    #[default]
    None,
    Right90,
    Right180,
    Left90,
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Rotation::None => "none",
            Rotation::Right90 => "right90",
            Rotation::Right180 => "right180",
            Rotation::Left90 => "left90",
        };
        write!(f, "{}", name)
    }
}

/// Identity of an item in the working set
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemKey {
    pub file_path: PathBuf,
    pub clone_index: u32,
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.file_path.display(), self.clone_index)
    }
}

/// One video file under edit, with its per-file edit parameters
#[derive(Debug, Clone, PartialEq)]
pub struct EditItem {
    file_path: PathBuf,
    clone_index: u32,
    original_info: MediaInfo,
    pub trimming: Trimming,
    pub clipping: Option<ClipRect>,
    pub rotation: Rotation,
    pub speed: Option<f64>,
    pub is_selected: bool,
}

impl EditItem {
    /// Create an unedited, unselected item
    pub fn new(file_path: impl Into<PathBuf>, clone_index: u32, original_info: MediaInfo) -> Self {
        Self {
            file_path: file_path.into(),
            clone_index,
            original_info,
            trimming: Trimming::unbounded(),
            clipping: None,
            rotation: Rotation::None,
            speed: None,
            is_selected: false,
        }
    }

    pub fn key(&self) -> ItemKey {
        ItemKey {
            file_path: self.file_path.clone(),
            clone_index: self.clone_index,
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn clone_index(&self) -> u32 {
        self.clone_index
    }

    pub fn original_info(&self) -> &MediaInfo {
        &self.original_info
    }

    /// File name without directory or extension
    pub fn file_stem(&self) -> String {
        self.file_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// `{stem}C{clone_index}{extension}`; `extension` carries its own dot
    pub fn output_file_name(&self, extension: &str) -> String {
        format!("{}C{}{}", self.file_stem(), self.clone_index, extension)
    }

    /// Crop rectangle, if one is set and has an area
    pub fn active_clipping(&self) -> Option<ClipRect> {
        self.clipping.filter(|rect| !rect.is_empty())
    }

    /// Speed multiplier, if one is set, finite and positive
    pub fn active_speed(&self) -> Option<f64> {
        self.speed.filter(|speed| speed.is_finite() && *speed > 0.0)
    }

    /// Copy every edit parameter into an entry with another clone index
    pub fn duplicate_as(&self, clone_index: u32) -> Self {
        Self {
            clone_index,
            ..self.clone()
        }
    }
}

/// Global encode settings shared by every item of one compress run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeSettings {
    /// Output width; <= 0 derives it from the aspect ratio
    pub target_width: i32,
    /// Output height; <= 0 derives it from the aspect ratio
    pub target_height: i32,
    /// Output frame rate; <= 0 keeps the source rate
    pub frame_rate: f64,
    /// Video codec name; blank keeps the encoder default
    pub codec: String,
    /// Output extension including the dot
    pub output_extension: String,
    pub audio_disabled: bool,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            target_width: -1,
            target_height: -1,
            frame_rate: -1.0,
            codec: "hevc".to_string(),
            output_extension: ".mp4".to_string(),
            audio_disabled: true,
        }
    }
}

impl EncodeSettings {
    /// Neutral re-encode used for the intermediates of a join
    pub fn join_intermediate() -> Self {
        Self {
            target_width: -1,
            target_height: -1,
            frame_rate: -1.0,
            codec: "h264".to_string(),
            output_extension: ".mp4".to_string(),
            audio_disabled: false,
        }
    }
}

/// Still-image extraction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    /// Image file extension without the dot
    pub image_format: String,
    /// Sampling rate; values below 1 are ignored
    pub frames_per_second: i32,
    /// Cap on extracted frames; values below 1 are ignored
    pub total_frame_count: i32,
    /// Encoder quality scale, lower is better; negative is unspecified
    pub quality: i32,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            image_format: "png".to_string(),
            frames_per_second: 5,
            total_frame_count: -1,
            quality: 0,
        }
    }
}

/// One unit of work for the runner: a source and the argument string to run for it
#[derive(Debug, Clone, PartialEq)]
pub struct CommandInfo<S = EditItem> {
    pub source: S,
    pub command: String,
    /// Executable to run instead of the runner's default encoder
    pub program: Option<PathBuf>,
}

impl<S> CommandInfo<S> {
    pub fn new(source: S, command: impl Into<String>) -> Self {
        Self {
            source,
            command: command.into(),
            program: None,
        }
    }

    pub fn with_program(source: S, program: impl Into<PathBuf>, command: impl Into<String>) -> Self {
        Self {
            source,
            command: command.into(),
            program: Some(program.into()),
        }
    }
}
