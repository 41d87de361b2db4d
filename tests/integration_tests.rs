//! Binary-level tests: the CLI driven through assert_cmd with stand-in tools

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Serialises tests that write executable scripts and spawn processes
static SERIAL: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(PoisonError::into_inner)
}

fn clipbatch(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("clipbatch").unwrap();
    cmd.current_dir(dir)
        .env_remove("CLIPBATCH_ENCODER")
        .env_remove("CLIPBATCH_PROBE")
        .env_remove("CLIPBATCH_OUTPUT_DIR")
        .env_remove("CLIPBATCH_JOBS")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    let _serial = serial();
    let temp_dir = TempDir::new().unwrap();
    clipbatch(temp_dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("compress"))
        .stdout(predicate::str::contains("join"))
        .stdout(predicate::str::contains("clear-cache"));
}

#[test]
fn test_invalid_log_level_fails() {
    let _serial = serial();
    let temp_dir = TempDir::new().unwrap();
    clipbatch(temp_dir.path())
        .args(["--log-level", "loud", "clear-cache"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid log level"));
}

#[test]
fn test_clear_cache_removes_scratch_files() {
    let _serial = serial();
    let temp_dir = TempDir::new().unwrap();
    let cache = temp_dir.path().join("cache");
    fs::create_dir_all(cache.join("thumbnails")).unwrap();
    fs::create_dir_all(cache.join("join")).unwrap();
    fs::write(cache.join("thumbnails").join("a.jpg"), b"x").unwrap();
    fs::write(cache.join("join").join("aC0.mp4"), b"x").unwrap();

    clipbatch(temp_dir.path())
        .args(["clear-cache"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 2 cached file(s)"));

    assert!(!cache.join("thumbnails").join("a.jpg").exists());
    assert!(temp_dir.path().join("UserSetting.json").exists());
}

#[test]
fn test_missing_manifest_fails() {
    let _serial = serial();
    let temp_dir = TempDir::new().unwrap();
    clipbatch(temp_dir.path())
        .args(["commands", "--manifest", "nope.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load manifest"));
}

#[cfg(unix)]
mod with_fake_tools {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    const FAKE_PROBE: &str = r#"#!/bin/sh
echo '{"streams":[{"codec_name":"h264","width":1920,"height":1080,"r_frame_rate":"30/1","duration":"10.0"}],"format":{"duration":"10.0"}}'
"#;

    const MANIFEST: &str = r#"
[[items]]
path = "a.mp4"
start = "1"
end = "00:00:05.250"

[[items]]
path = "b.MOV"
clip = { x = -10.0, y = 0.0, width = 960.0, height = 540.0 }

[[items]]
path = "notes.txt"

[[items]]
path = "d.mp4"
selected = false
"#;

    /// Workspace with a fake ffprobe, source files and a manifest
    fn workspace() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let probe = temp_dir.path().join("fake-ffprobe");
        fs::write(&probe, FAKE_PROBE).unwrap();
        fs::set_permissions(&probe, fs::Permissions::from_mode(0o755)).unwrap();

        for name in ["a.mp4", "b.MOV", "notes.txt", "d.mp4"] {
            fs::write(temp_dir.path().join(name), b"video").unwrap();
        }
        fs::write(temp_dir.path().join("clips.toml"), MANIFEST).unwrap();
        (temp_dir, probe)
    }

    #[test]
    fn test_dry_run_prints_commands() {
        let _serial = serial();
        let (temp_dir, probe) = workspace();

        let assert = clipbatch(temp_dir.path())
            .arg("--probe")
            .arg(&probe)
            .args([
                "commands",
                "--manifest",
                "clips.toml",
                "--codec",
                "h264",
                "--height",
                "720",
                "--output-dir",
                "out",
            ])
            .assert()
            .success();

        let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
        let lines: Vec<&str> = stdout.lines().collect();
        assert_eq!(lines.len(), 2, "{}", stdout);

        assert!(lines[0].starts_with("ffmpeg -y -i \""));
        assert!(lines[0].contains("-vf \"scale=1280:720\" -c:v h264 -an -ss 00:00:01.000 -to 00:00:05.250"));
        assert!(lines[0].ends_with("aC0.mp4\""));
        assert!(lines[1].contains("-vf \"crop=960.00:540.00:0.00:0.00,scale=1280:720\""));
        assert!(lines[1].ends_with("bC0.mp4\""));

        let settings = fs::read_to_string(temp_dir.path().join("UserSetting.json")).unwrap();
        assert!(settings.contains("\"output_directory\": \"out\""));
    }

    #[test]
    fn test_image_dry_run() {
        let _serial = serial();
        let (temp_dir, probe) = workspace();

        clipbatch(temp_dir.path())
            .arg("--probe")
            .arg(&probe)
            .args([
                "commands",
                "--images",
                "--manifest",
                "clips.toml",
                "--format",
                "jpg",
                "--frames",
                "10",
                "-o",
                "frames",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("-r 5 -frames:v 10 -q:v 0"))
            .stdout(predicate::str::contains("aC0_%06d.jpg"));

        assert!(temp_dir.path().join("frames").join("a").is_dir());
    }

    #[test]
    fn test_probe_prints_json() {
        let _serial = serial();
        let (temp_dir, probe) = workspace();

        clipbatch(temp_dir.path())
            .arg("--probe")
            .arg(&probe)
            .args(["probe", "--input", "a.mp4"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"width\": 1920"))
            .stdout(predicate::str::contains("\"duration\": \"00:00:10.000\""));
    }

    #[test]
    fn test_probe_rejects_unsupported_extension() {
        let _serial = serial();
        let (temp_dir, probe) = workspace();

        clipbatch(temp_dir.path())
            .arg("--probe")
            .arg(&probe)
            .args(["probe", "--input", "notes.txt"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unsupported input"));
    }

    #[test]
    fn test_compress_removes_completed_and_saves_manifest() {
        let _serial = serial();
        let (temp_dir, probe) = workspace();

        clipbatch(temp_dir.path())
            .arg("--probe")
            .arg(&probe)
            .args(["--encoder", "true", "--yes", "--jobs", "2"])
            .args(["compress", "--manifest", "clips.toml", "--save-manifest", "-o", "out"])
            .assert()
            .success()
            .stdout(predicate::str::contains("compress: 2 item(s) completed, 2 removed"));

        let saved = fs::read_to_string(temp_dir.path().join("clips.toml")).unwrap();
        assert!(saved.contains("d.mp4"));
        assert!(!saved.contains("a.mp4"));
        assert!(!saved.contains("notes.txt"));
        assert!(temp_dir.path().join("out").is_dir());
    }

    #[test]
    fn test_thumbnail_path_printed() {
        let _serial = serial();
        let (temp_dir, _probe) = workspace();

        clipbatch(temp_dir.path())
            .args(["--encoder", "true", "thumbnail", "--input", "a.mp4", "--at", "00:00:02"])
            .assert()
            .success()
            .stdout(predicate::str::contains("thumbnails/a.jpg"));
    }
}
