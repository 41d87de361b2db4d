//! Batch manifest: the working set as a TOML, YAML or JSON file

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::WorkingSet;
use crate::ports::*;
use crate::utils::time::{format_timestamp, parse_timestamp};

/// On-disk encoding, picked from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Toml,
    Yaml,
    Json,
}

impl ManifestFormat {
    pub fn from_path(path: &Path) -> DomainResult<Self> {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "toml" => Ok(ManifestFormat::Toml),
            "yaml" | "yml" => Ok(ManifestFormat::Yaml),
            "json" => Ok(ManifestFormat::Json),
            other => Err(DomainError::Manifest(format!(
                "Unknown manifest format '{}' for {}; use .toml, .yaml or .json",
                other,
                path.display()
            ))),
        }
    }
}

fn default_selected() -> bool {
    true
}

/// One manifest entry: a source file and its edits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clone_index: Option<u32>,
    #[serde(default = "default_selected")]
    pub selected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip: Option<ClipRect>,
    #[serde(default)]
    pub rotation: Rotation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

impl ManifestEntry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            clone_index: None,
            selected: true,
            start: None,
            end: None,
            clip: None,
            rotation: Rotation::None,
            speed: None,
        }
    }

    fn from_item(item: &EditItem) -> Self {
        Self {
            path: item.file_path().to_path_buf(),
            clone_index: Some(item.clone_index()),
            selected: item.is_selected,
            start: item.trimming.start_point().map(format_timestamp),
            end: item.trimming.end_point().map(format_timestamp),
            clip: item.clipping,
            rotation: item.rotation,
            speed: item.speed,
        }
    }

    fn trimming(&self) -> DomainResult<Trimming> {
        let start = self.start.as_deref().map(parse_timestamp).transpose()?;
        let end = self.end.as_deref().map(parse_timestamp).transpose()?;
        Trimming::new(start, end)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub items: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn parse(content: &str, format: ManifestFormat) -> DomainResult<Self> {
        let parsed = match format {
            ManifestFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
            ManifestFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            ManifestFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        };
        parsed.map_err(|e| DomainError::Manifest(format!("Failed to parse manifest: {}", e)))
    }

    pub fn render(&self, format: ManifestFormat) -> DomainResult<String> {
        let rendered = match format {
            ManifestFormat::Toml => toml::to_string_pretty(self).map_err(|e| e.to_string()),
            ManifestFormat::Yaml => serde_yaml::to_string(self).map_err(|e| e.to_string()),
            ManifestFormat::Json => serde_json::to_string_pretty(self).map_err(|e| e.to_string()),
        };
        rendered.map_err(|e| DomainError::Manifest(format!("Failed to write manifest: {}", e)))
    }

    pub fn load(path: &Path) -> DomainResult<Self> {
        let format = ManifestFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, format)
    }

    pub fn save(&self, path: &Path) -> DomainResult<()> {
        let format = ManifestFormat::from_path(path)?;
        std::fs::write(path, self.render(format)?)?;
        info!("Wrote {} item(s) to {}", self.items.len(), path.display());
        Ok(())
    }

    pub fn from_working_set(working: &WorkingSet) -> Self {
        Self {
            items: working.items().iter().map(ManifestEntry::from_item).collect(),
        }
    }

    /// Probe every entry and build the working set, in manifest order.
    ///
    /// Relative paths resolve against `base_dir`. Entries that cannot be
    /// probed or carry invalid edits are logged and skipped.
    pub async fn into_working_set(self, inspector: &dyn MediaInspector, base_dir: &Path) -> WorkingSet {
        let mut working = WorkingSet::new();

        for entry in self.items {
            let path = if entry.path.is_relative() {
                base_dir.join(&entry.path)
            } else {
                entry.path.clone()
            };

            let info = match inspector.inspect(&path).await {
                Ok(info) => info,
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };

            let trimming = match entry.trimming() {
                Ok(trimming) => trimming,
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };

            let clone_index = entry
                .clone_index
                .unwrap_or_else(|| working.next_clone_index(&path));
            let mut item = EditItem::new(path, clone_index, info);
            item.trimming = trimming;
            item.clipping = entry.clip;
            item.rotation = entry.rotation;
            item.speed = entry.speed;
            item.is_selected = entry.selected;
            working.push(item);
        }

        working
    }
}
