pub mod discovery;
pub mod resolver;

pub use discovery::{ConfigDiscovery, DiscoveredConfig};
pub use resolver::ConfigResolver;

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_HOST: &str = "http://localhost:8080";
pub const DEFAULT_STORAGE_ENGINE: &str = "dgraph";
pub const DEFAULT_DIRECTORY: &str = "cg";

/// Settings given explicitly on the command line (or through `DGRAPH_HOST`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlagInput {
    pub host: Option<String>,
    pub storage_engine: Option<String>,
    pub directory: Option<String>,
}

/// Contents of a discovered `cloud-graph` config file
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConfigFile {
    #[serde(rename = "cloudGraph", default)]
    pub cloud_graph: CloudGraphSection,
    /// Every other top-level key holds one provider's settings.
    #[serde(flatten)]
    pub providers: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudGraphSection {
    pub directory: Option<String>,
    pub dgraph_host: Option<String>,
    pub storage: Option<String>,
}

/// Which layer a resolved value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Flag,
    File,
    Default,
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ValueSource::Flag => "flag",
            ValueSource::File => "config file",
            ValueSource::Default => "default",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigOrigins {
    pub host: ValueSource,
    pub storage_engine: ValueSource,
    pub directory: ValueSource,
}

/// Final settings for one command run
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub host: String,
    pub storage_engine: String,
    pub directory: String,
    pub provider_config: BTreeMap<String, Value>,
    pub origins: ConfigOrigins,
}

impl ResolvedConfig {
    pub fn provider_settings(&self, provider: &str) -> Option<&Value> {
        self.provider_config.get(provider)
    }

    /// Where collected data lives: `directory` under `base` unless absolute.
    pub fn data_dir(&self, base: &Path) -> PathBuf {
        base.join(&self.directory)
    }
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        ConfigResolver::resolve(&FlagInput::default(), None)
    }
}
