//! Encoder argument strings for compress, image extraction, thumbnails and concat
//!
//! Every builder here is total: settings that make no sense (non-positive
//! sizes, blank codec, negative quality) leave their argument out instead of
//! failing. Argument order matters to the encoder and is fixed:
//!
//! ```text
//! -y -i <input> [-vf crop,scale,rotate,setpts] [-af atempo] [-metadata rotate=0]
//!     [-r] [-c:v] [-an] [-ss] [-to] <output>
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::warn;

use crate::domain::model::*;
use crate::utils::cmdline::quote_path;
use crate::utils::path::resolve_non_duplicate;
use crate::utils::time::format_timestamp;

/// Lowest and highest factor a single `atempo` filter accepts
const ATEMPO_MIN: f64 = 0.5;
const ATEMPO_MAX: f64 = 2.0;

/// Build the compress command for one item
pub fn to_compress_command(
    item: &EditItem,
    settings: &EncodeSettings,
    output_directory: &Path,
    deduplicate: bool,
) -> String {
    let mut args = vec![format!("-y -i {}", quote_path(item.file_path()))];

    let filters = video_filters(item, settings);
    if !filters.is_empty() {
        args.push(format!("-vf \"{}\"", filters.join(",")));
    }

    // audio tempo follows the video speed; pointless when audio is dropped
    if let Some(speed) = item.active_speed() {
        if !settings.audio_disabled {
            args.push(format!("-af {}", atempo_chain(speed)));
        }
    }

    if item.rotation != Rotation::None {
        args.push("-metadata:s:v:0 rotate=0".to_string());
    }

    if settings.frame_rate > 0.0 {
        args.push(format!("-r {}", settings.frame_rate));
    }

    let codec = settings.codec.trim();
    if !codec.is_empty() {
        args.push(format!("-c:v {}", codec));
    }

    if settings.audio_disabled {
        args.push("-an".to_string());
    }

    push_trim_args(&item.trimming, &mut args);

    let output = output_path(item, output_directory, &settings.output_extension);
    let output = if deduplicate {
        resolve_non_duplicate(&output)
    } else {
        output
    };
    args.push(quote_path(&output));

    args.join(" ")
}

/// Build the still-image extraction command for one item.
///
/// Frames land in `{output_directory}/{stem}/`, which is created if absent.
pub fn to_image_command(item: &EditItem, settings: &ImageSettings, output_directory: &Path) -> String {
    let mut args = vec![format!("-y -i {}", quote_path(item.file_path()))];

    if settings.frames_per_second >= 1 {
        args.push(format!("-r {}", settings.frames_per_second));
    }

    if settings.total_frame_count >= 1 {
        args.push(format!("-frames:v {}", settings.total_frame_count));
    }

    if settings.quality >= 0 {
        args.push(format!("-q:v {}", settings.quality));
    }

    push_trim_args(&item.trimming, &mut args);

    let stem = item.file_stem();
    let frame_dir = output_directory.join(&stem);
    if let Err(e) = std::fs::create_dir_all(&frame_dir) {
        warn!("Could not create frame directory {}: {}", frame_dir.display(), e);
    }

    let format = settings.image_format.trim_start_matches('.');
    let pattern = frame_dir.join(format!(
        "{}C{}_%06d.{}",
        stem,
        item.clone_index(),
        format
    ));
    args.push(quote_path(&resolve_non_duplicate(&pattern)));

    args.join(" ")
}

/// Single-frame grab used for thumbnails
pub fn to_thumbnail_command(input: &Path, position: Duration, output: &Path) -> String {
    format!(
        "-y -i {} -ss {} -vframes 1 -q:v 0 {}",
        quote_path(input),
        format_timestamp(position),
        quote_path(output)
    )
}

/// Stream-copy concatenation of the files listed in a concat list file
pub fn to_concat_command(list_file: &Path, output: &Path) -> String {
    format!(
        "-y -f concat -safe 0 -i {} -c copy {}",
        quote_path(list_file),
        quote_path(output)
    )
}

/// `{output_directory}/{stem}C{clone_index}{extension}`
pub fn output_path(item: &EditItem, output_directory: &Path, extension: &str) -> PathBuf {
    output_directory.join(item.output_file_name(extension))
}

/// Round an odd dimension up to the next even number
pub fn ceil_even(value: i64) -> i64 {
    if value % 2 != 0 {
        value + 1
    } else {
        value
    }
}

/// Filter chain in its fixed order: crop, scale, rotate, speed
fn video_filters(item: &EditItem, settings: &EncodeSettings) -> Vec<String> {
    let info = item.original_info();
    let mut source_width = info.width as f64;
    let mut source_height = info.height as f64;
    let mut filters = Vec::new();

    if let Some(rect) = item.active_clipping() {
        let clamped = rect.clamp_to(source_width, source_height);
        // a rectangle entirely outside the frame clamps to nothing
        if !clamped.is_empty() {
            filters.push(format!(
                "crop={:.2}:{:.2}:{:.2}:{:.2}",
                clamped.width, clamped.height, clamped.x, clamped.y
            ));
            source_width = clamped.width;
            source_height = clamped.height;
        }
    }

    if let Some(scale) = scale_filter(
        source_width,
        source_height,
        settings.target_width,
        settings.target_height,
    ) {
        filters.push(scale);
    }

    if let Some(rotate) = rotate_filter(item.rotation) {
        filters.push(rotate.to_string());
    }

    if let Some(speed) = item.active_speed() {
        filters.push(format!("setpts=PTS/{}", speed));
    }

    filters
}

/// Non-positive targets are "auto": derived from the source aspect ratio
fn scale_filter(source_width: f64, source_height: f64, width: i32, height: i32) -> Option<String> {
    match (width > 0, height > 0) {
        (true, true) => Some(format!("scale={}:{}", width, height)),
        (false, true) => {
            let auto_width = auto_dimension(height, source_width, source_height);
            Some(format!("scale={}:{}", auto_width, height))
        }
        (true, false) => {
            let auto_height = auto_dimension(width, source_height, source_width);
            Some(format!("scale={}:{}", width, auto_height))
        }
        (false, false) => None,
    }
}

/// `given * source_other / source_given` in whole pixels, then made even.
///
/// Source sizes are truncated to integers first, so a fractional crop
/// (862.35) divides as its whole-pixel size (862). A zero-sized source
/// yields 0 rather than dividing by zero.
fn auto_dimension(given: i32, source_other: f64, source_given: f64) -> i64 {
    let source_other = source_other.trunc() as i64;
    let source_given = source_given.trunc() as i64;
    if source_given <= 0 {
        return 0;
    }
    ceil_even(given as i64 * source_other / source_given)
}

fn rotate_filter(rotation: Rotation) -> Option<&'static str> {
    match rotation {
        Rotation::None => None,
        Rotation::Right90 => Some("transpose=1"),
        Rotation::Right180 => Some("hflip,vflip"),
        Rotation::Left90 => Some("transpose=2"),
    }
}

/// Split a tempo factor into `atempo` stages that each stay within range
fn atempo_chain(speed: f64) -> String {
    let mut remaining = speed;
    let mut stages = Vec::new();

    while remaining > ATEMPO_MAX {
        stages.push(format!("atempo={}", ATEMPO_MAX));
        remaining /= ATEMPO_MAX;
    }
    while remaining < ATEMPO_MIN {
        stages.push(format!("atempo={}", ATEMPO_MIN));
        remaining /= ATEMPO_MIN;
    }
    stages.push(format!("atempo={}", remaining));

    stages.join(",")
}

fn push_trim_args(trimming: &Trimming, args: &mut Vec<String>) {
    if let Some(start) = trimming.start_point() {
        args.push(format!("-ss {}", format_timestamp(start)));
    }
    if let Some(end) = trimming.end_point() {
        args.push(format!("-to {}", format_timestamp(end)));
    }
}
