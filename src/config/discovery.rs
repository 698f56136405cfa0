use crate::config::ConfigFile;
use crate::error::{CgError, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

const MODULE_NAME: &str = "cloud-graph";

/// File names checked in every directory, in order.
const SEARCH_PLACES: &[&str] = &[
    "package.json",
    ".cloud-graphrc",
    ".cloud-graphrc.json",
    ".cloud-graphrc.yaml",
    ".cloud-graphrc.yml",
    ".cloud-graphrc.toml",
    "cloud-graph.config.json",
];

#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredConfig {
    pub path: PathBuf,
    pub config: ConfigFile,
}

/// Looks for a `cloud-graph` config file from a directory upward.
pub struct ConfigDiscovery;

impl ConfigDiscovery {
    pub fn search<P: AsRef<Path>>(start: P) -> Result<Option<DiscoveredConfig>> {
        for dir in start.as_ref().ancestors() {
            for place in SEARCH_PLACES {
                let path = dir.join(place);
                if !path.is_file() {
                    continue;
                }

                if let Some(value) = Self::read(&path)? {
                    tracing::debug!(path = %path.display(), "found config file");
                    let config = Self::into_config(&path, value)?;
                    return Ok(Some(DiscoveredConfig { path, config }));
                }
            }
        }

        Ok(None)
    }

    /// `None` when the file exists but holds no config for us
    /// (a `package.json` without a `cloud-graph` key).
    fn read(path: &Path) -> Result<Option<Value>> {
        let content = std::fs::read_to_string(path)?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();

        if file_name == "package.json" {
            let package: Value = serde_json::from_str(&content).map_err(|e| parse_error(path, e))?;
            return Ok(package.get(MODULE_NAME).cloned());
        }

        if content.trim().is_empty() {
            return Ok(Some(Value::Null));
        }

        let value = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&content).map_err(|e| parse_error(path, e))?,
            Some("toml") => toml::from_str(&content).map_err(|e| parse_error(path, e))?,
            // YAML also covers the extensionless rc file, JSON included.
            _ => serde_yaml::from_str(&content).map_err(|e| parse_error(path, e))?,
        };
        Ok(Some(value))
    }

    fn into_config(path: &Path, value: Value) -> Result<ConfigFile> {
        if value.is_null() {
            return Ok(ConfigFile::default());
        }
        serde_json::from_value(value).map_err(|e| parse_error(path, e))
    }
}

fn parse_error(path: &Path, err: impl std::fmt::Display) -> CgError {
    CgError::ConfigParse {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}
