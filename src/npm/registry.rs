use crate::error::{CgError, Result};
use crate::plugin::installer::{
    InstalledPlugin, Installer, PLUGIN_MANIFEST, PluginManifest, installed_at,
};
use crate::plugin::version::{VersionSpec, parse_version};
use reqwest::blocking::Client;
use semver::Version;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org";
const PACKAGE_SCOPE: &str = "@cloudgraph";
const PACKAGE_PREFIX: &str = "cg-provider-";
const MAX_TARBALL_BYTES: usize = 50 * 1024 * 1024;

/// Installs provider plugins published to an npm compatible registry
pub struct RegistryInstaller {
    client: Client,
    registry: String,
    plugin_root: PathBuf,
}

impl RegistryInstaller {
    pub fn new<P: AsRef<Path>>(registry: &str, plugin_root: P) -> Result<Self> {
        Self::validate_registry_url(registry)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(concat!("cg/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            registry: registry.trim_end_matches('/').to_string(),
            plugin_root: plugin_root.as_ref().to_path_buf(),
        })
    }

    /// `CG_PLUGIN_REGISTRY`, falling back to the public npm registry.
    pub fn default_registry() -> String {
        std::env::var("CG_PLUGIN_REGISTRY").unwrap_or_else(|_| DEFAULT_REGISTRY.to_string())
    }

    pub fn package_name(provider: &str) -> String {
        format!("{PACKAGE_SCOPE}/{PACKAGE_PREFIX}{provider}")
    }

    fn fetch_document(&self, provider: &str, requested: &VersionSpec) -> Result<PackageDocument> {
        // Scoped packages keep the `@` but escape the slash.
        let encoded = Self::package_name(provider).replace('/', "%2f");
        let url = format!("{}/{}", self.registry, encoded);
        tracing::debug!(%url, "fetching package document");

        let response = self.client.get(&url).send()?;
        if !response.status().is_success() {
            return Err(CgError::InstallFailure {
                provider: provider.to_string(),
                version: requested.to_string(),
                reason: format!("registry returned HTTP {} for {url}", response.status()),
            });
        }

        Ok(response.json()?)
    }

    fn download(&self, provider: &str, version: &Version, tarball: &str, target: &Path) -> Result<()> {
        tracing::debug!(url = tarball, "downloading plugin tarball");
        let bytes = self.client.get(tarball).send()?.error_for_status()?.bytes()?;

        if bytes.len() > MAX_TARBALL_BYTES {
            return Err(CgError::InstallFailure {
                provider: provider.to_string(),
                version: version.to_string(),
                reason: "package tarball exceeded 50MB limit".to_string(),
            });
        }

        std::fs::create_dir_all(target)?;
        std::fs::write(target.join("package.tgz"), &bytes)?;
        Ok(())
    }

    fn validate_registry_url(url: &str) -> Result<()> {
        let parsed = Url::parse(url)
            .map_err(|_| CgError::PluginLoad {
                provider: "-".to_string(),
                reason: format!("Invalid plugin registry URL: {url}"),
            })?;

        match parsed.scheme() {
            "https" | "http" => Ok(()),
            scheme => Err(CgError::PluginLoad {
                provider: "-".to_string(),
                reason: format!("Unsupported plugin registry scheme: {scheme}"),
            }),
        }
    }
}

impl Installer for RegistryInstaller {
    fn install(&self, name: &str, requested: &VersionSpec) -> Result<InstalledPlugin> {
        let document = self.fetch_document(name, requested)?;
        let available = document.available_versions();
        let latest_tag = document.dist_tags.get("latest").and_then(|v| parse_version(v));

        let version = requested
            .select(&available, latest_tag.as_ref())
            .ok_or_else(|| CgError::InstallFailure {
                provider: name.to_string(),
                version: requested.to_string(),
                reason: format!("no published version of {} matches", Self::package_name(name)),
            })?;

        let tarball = document
            .versions
            .get(&version.to_string())
            .map(|release| release.dist.tarball.clone())
            .ok_or_else(|| CgError::InstallFailure {
                provider: name.to_string(),
                version: version.to_string(),
                reason: "release has no tarball".to_string(),
            })?;

        let location = self.location(name, &version);
        self.download(name, &version, &tarball, &location)?;

        let manifest = PluginManifest {
            name: name.to_string(),
            version: version.to_string(),
            tarball: Some(tarball.clone()),
        };
        std::fs::write(
            location.join(PLUGIN_MANIFEST),
            serde_json::to_string_pretty(&manifest)?,
        )?;

        Ok(InstalledPlugin {
            name: name.to_string(),
            location,
            metadata: json!({
                "source": self.registry,
                "tarball": tarball,
                "installedAt": installed_at(),
            }),
            version,
        })
    }

    fn location(&self, name: &str, version: &Version) -> PathBuf {
        self.plugin_root.join(name).join(version.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct PackageDocument {
    #[serde(rename = "dist-tags", default)]
    dist_tags: HashMap<String, String>,
    #[serde(default)]
    versions: HashMap<String, PackageRelease>,
}

impl PackageDocument {
    fn available_versions(&self) -> Vec<Version> {
        let mut versions: Vec<Version> = self
            .versions
            .keys()
            .filter_map(|v| parse_version(v))
            .collect();
        versions.sort();
        versions
    }
}

#[derive(Debug, Deserialize)]
struct PackageRelease {
    dist: Dist,
}

#[derive(Debug, Deserialize)]
struct Dist {
    tarball: String,
}
