//! ffprobe-based media inspector
//!
//! Runs the external `ffprobe` against the first video stream and reads its
//! JSON report.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;
use crate::utils::process::hide_console_window;

/// Containers the inspector accepts, compared case-insensitively
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "agm", "avi", "wmv"];

/// Whether `path` carries one of the recognised video extensions
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    codec_name: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// FFprobe-based inspector
pub struct FfprobeInspector {
    program: PathBuf,
}

impl FfprobeInspector {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl MediaInspector for FfprobeInspector {
    async fn inspect(&self, file_path: &Path) -> DomainResult<MediaInfo> {
        if !is_video_file(file_path) {
            return Err(DomainError::UnsupportedInput {
                path: file_path.to_path_buf(),
                extension: file_path
                    .extension()
                    .map(|ext| ext.to_string_lossy().to_string())
                    .unwrap_or_default(),
            });
        }

        let file_size = tokio::fs::metadata(file_path)
            .await
            .map_err(|e| DomainError::ProbeFailed {
                path: file_path.to_path_buf(),
                message: e.to_string(),
            })?
            .len();

        let mut cmd = Command::new(&self.program);
        cmd.args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,r_frame_rate,codec_name,duration:format=duration",
            "-of",
            "json",
        ])
        .arg(file_path)
        .stdin(Stdio::null())
        .kill_on_drop(true);
        hide_console_window(&mut cmd);

        debug!("Probing {}", file_path.display());
        let output = cmd.output().await.map_err(|source| DomainError::Launch {
            program: self.program.display().to_string(),
            source,
        })?;

        if !output.status.success() {
            return Err(DomainError::ProbeFailed {
                path: file_path.to_path_buf(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_probe_output(file_path, &output.stdout, file_size)
    }
}

/// Turn an ffprobe JSON report into [`MediaInfo`]
fn parse_probe_output(path: &Path, json: &[u8], file_size: u64) -> DomainResult<MediaInfo> {
    let report: ProbeOutput = serde_json::from_slice(json).map_err(|e| DomainError::ProbeFailed {
        path: path.to_path_buf(),
        message: format!("unreadable ffprobe output: {}", e),
    })?;

    let stream = report
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| DomainError::NoVideoStream {
            path: path.to_path_buf(),
        })?;

    // stream duration first, container duration as fallback
    let seconds = stream
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .or_else(|| {
            report
                .format
                .and_then(|format| format.duration)
                .and_then(|d| d.parse::<f64>().ok())
        })
        .filter(|seconds| seconds.is_finite() && *seconds >= 0.0)
        .unwrap_or(0.0);

    Ok(MediaInfo {
        duration: Duration::from_secs_f64(seconds),
        width: stream.width.unwrap_or(0),
        height: stream.height.unwrap_or(0),
        frame_rate: stream
            .r_frame_rate
            .as_deref()
            .map(parse_frame_rate)
            .unwrap_or(0.0),
        video_codec: stream.codec_name.unwrap_or_default(),
        file_size,
    })
}

/// "30000/1001" or "25" to frames per second; 0 when unreadable
fn parse_frame_rate(rate: &str) -> f64 {
    match rate.split_once('/') {
        Some((num, den)) => {
            let num = num.trim().parse::<f64>().unwrap_or(0.0);
            let den = den.trim().parse::<f64>().unwrap_or(0.0);
            if den > 0.0 {
                num / den
            } else {
                0.0
            }
        }
        None => rate.trim().parse::<f64>().unwrap_or(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_extensions_any_case() {
        assert!(is_video_file(Path::new("a.mp4")));
        assert!(is_video_file(Path::new("a.MOV")));
        assert!(is_video_file(Path::new("dir/a.Wmv")));
        assert!(!is_video_file(Path::new("a.mkv")));
        assert!(!is_video_file(Path::new("noext")));
    }

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("30/1"), 30.0);
        assert!((parse_frame_rate("30000/1001") - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("25"), 25.0);
        assert_eq!(parse_frame_rate("0/0"), 0.0);
    }

    #[test]
    fn test_parse_report() {
        let json = br#"{
            "programs": [],
            "streams": [
                {"codec_name": "h264", "width": 1920, "height": 1080, "r_frame_rate": "60/1", "duration": "12.500000"}
            ],
            "format": {"duration": "12.600000"}
        }"#;

        let info = parse_probe_output(Path::new("a.mp4"), json, 2048).unwrap();
        assert_eq!(info.width, 1920);
        assert_eq!(info.height, 1080);
        assert_eq!(info.frame_rate, 60.0);
        assert_eq!(info.video_codec, "h264");
        assert_eq!(info.duration, Duration::from_millis(12_500));
        assert_eq!(info.file_size, 2048);
    }

    #[test]
    fn test_container_duration_fallback() {
        let json = br#"{"streams": [{"width": 640, "height": 480}], "format": {"duration": "3.000000"}}"#;
        let info = parse_probe_output(Path::new("a.avi"), json, 0).unwrap();
        assert_eq!(info.duration, Duration::from_secs(3));
        assert_eq!(info.frame_rate, 0.0);
    }

    #[test]
    fn test_no_video_stream() {
        let json = br#"{"streams": [], "format": {"duration": "3.0"}}"#;
        let result = parse_probe_output(Path::new("a.mp4"), json, 0);
        assert!(matches!(result, Err(DomainError::NoVideoStream { .. })));
    }

    #[tokio::test]
    async fn test_unsupported_extension_is_rejected_before_probing() {
        let inspector = FfprobeInspector::new("/no/such/ffprobe");
        let result = inspector.inspect(Path::new("notes.txt")).await;
        match result {
            Err(DomainError::UnsupportedInput { extension, .. }) => assert_eq!(extension, "txt"),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_missing_file_fails_probe() {
        let inspector = FfprobeInspector::new("/no/such/ffprobe");
        let result = inspector.inspect(Path::new("/no/such/dir/clip.mp4")).await;
        assert!(matches!(result, Err(DomainError::ProbeFailed { .. })));
    }
}
