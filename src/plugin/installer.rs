use crate::error::{CgError, Result};
use crate::plugin::version::{VersionSpec, parse_version};
use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};

pub const PLUGIN_MANIFEST: &str = "plugin.json";

/// A provider plugin present on disk at a concrete version
#[derive(Debug, Clone, PartialEq)]
pub struct InstalledPlugin {
    pub name: String,
    pub version: Version,
    pub location: PathBuf,
    pub metadata: Value,
}

/// Fetches provider plugins. Implementations may hit the network.
pub trait Installer: Send + Sync {
    fn install(&self, name: &str, requested: &VersionSpec) -> Result<InstalledPlugin>;

    /// Where `name@version` lives once installed.
    fn location(&self, name: &str, version: &Version) -> PathBuf;
}

/// Manifest written next to every installed plugin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tarball: Option<String>,
}

/// `CG_PLUGIN_DIR`, or `plugins/` under the platform data directory.
pub fn default_plugin_root() -> PathBuf {
    if let Ok(dir) = std::env::var("CG_PLUGIN_DIR") {
        return PathBuf::from(dir);
    }

    directories::ProjectDirs::from("", "", "cloudgraph")
        .map(|dirs| dirs.data_dir().join("plugins"))
        .unwrap_or_else(|| PathBuf::from(".cloudgraph").join("plugins"))
}

pub fn installed_at() -> String {
    jiff::Timestamp::now().to_string()
}

/// Development mode installer: plugins are checked out under `./plugins/<name>`
/// and carry a `plugin.json` manifest; nothing is downloaded.
pub struct LocalInstaller {
    root: PathBuf,
}

impl LocalInstaller {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn read_manifest(&self, name: &str) -> Result<PluginManifest> {
        let path = self.root.join(name).join(PLUGIN_MANIFEST);
        let content = std::fs::read_to_string(&path).map_err(|e| CgError::InstallFailure {
            provider: name.to_string(),
            version: "local".to_string(),
            reason: format!("cannot read {}: {e}", path.display()),
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl Installer for LocalInstaller {
    fn install(&self, name: &str, requested: &VersionSpec) -> Result<InstalledPlugin> {
        let manifest = self.read_manifest(name)?;
        let version = parse_version(&manifest.version).ok_or_else(|| CgError::InstallFailure {
            provider: name.to_string(),
            version: requested.to_string(),
            reason: format!("local manifest has invalid version '{}'", manifest.version),
        })?;

        // A local checkout is by definition the newest thing available.
        if !requested.is_satisfied_by(&version, Some(&version)) {
            return Err(CgError::InstallFailure {
                provider: name.to_string(),
                version: requested.to_string(),
                reason: format!("local checkout is at {version}"),
            });
        }

        tracing::debug!(provider = name, %version, "using local plugin checkout");

        Ok(InstalledPlugin {
            name: name.to_string(),
            location: self.location(name, &version),
            metadata: json!({ "source": "local", "installedAt": installed_at() }),
            version,
        })
    }

    fn location(&self, name: &str, _version: &Version) -> PathBuf {
        self.root.join(name)
    }
}
