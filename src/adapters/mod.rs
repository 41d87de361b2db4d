// Adapters - External system implementations

pub mod console_presenter;
pub mod json_settings;
pub mod manifest;
pub mod probe_ffprobe;
pub mod thumbnail_ffmpeg;

// Re-export adapters
pub use console_presenter::ConsolePresenter;
pub use json_settings::{JsonSettingsStore, UserSetting};
pub use manifest::{Manifest, ManifestEntry, ManifestFormat};
pub use probe_ffprobe::FfprobeInspector;
pub use thumbnail_ffmpeg::FfmpegThumbnailExtractor;
