use crate::error::{CgError, Result};
use crate::plugin::installer::InstalledPlugin;
use semver::Version;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Providers linked into this binary.
pub const BUILTIN_PROVIDERS: &[&str] = &["aws", "azure", "gcp", "k8s"];

/// Everything a provider client is built from
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub provider: String,
    pub version: Version,
    pub config: Option<Value>,
    pub dev_mode: bool,
}

/// A ready-to-use provider client
pub trait ProviderClient: Send + Sync {
    fn name(&self) -> &str;
    fn version(&self) -> &Version;
    fn settings(&self) -> Option<&Value>;
}

/// The constructor a provider plugin exports
pub trait ProviderPlugin: Send + Sync {
    fn construct(&self, settings: ProviderSettings) -> Result<Arc<dyn ProviderClient>>;
}

/// Turns an installed plugin into its exported constructor
pub trait PluginLoader: Send + Sync {
    fn load(&self, plugin: &InstalledPlugin) -> Result<Arc<dyn ProviderPlugin>>;
}

/// Plugin table resolved at startup instead of loading code at runtime.
#[derive(Default)]
pub struct StaticPluginLoader {
    plugins: HashMap<String, Arc<dyn ProviderPlugin>>,
}

impl StaticPluginLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtin() -> Self {
        let mut loader = Self::new();
        for name in BUILTIN_PROVIDERS {
            loader.register(*name, Arc::new(BundledProvider));
        }
        loader
    }

    pub fn register(&mut self, name: impl Into<String>, plugin: Arc<dyn ProviderPlugin>) {
        self.plugins.insert(name.into(), plugin);
    }
}

impl PluginLoader for StaticPluginLoader {
    fn load(&self, plugin: &InstalledPlugin) -> Result<Arc<dyn ProviderPlugin>> {
        tracing::debug!(
            provider = %plugin.name,
            location = %plugin.location.display(),
            "loading linked plugin"
        );
        self.plugins
            .get(&plugin.name)
            .cloned()
            .ok_or_else(|| CgError::PluginLoad {
                provider: plugin.name.clone(),
                reason: "no plugin with this name is linked into cg".to_string(),
            })
    }
}

struct BundledProvider;

impl ProviderPlugin for BundledProvider {
    fn construct(&self, settings: ProviderSettings) -> Result<Arc<dyn ProviderClient>> {
        if let Some(config) = &settings.config {
            if !config.is_object() {
                return Err(CgError::PluginLoad {
                    provider: settings.provider,
                    reason: "provider settings must be an object".to_string(),
                });
            }
        }

        tracing::debug!(
            provider = %settings.provider,
            version = %settings.version,
            dev = settings.dev_mode,
            "constructing provider client"
        );
        Ok(Arc::new(BundledClient { settings }))
    }
}

struct BundledClient {
    settings: ProviderSettings,
}

impl ProviderClient for BundledClient {
    fn name(&self) -> &str {
        &self.settings.provider
    }

    fn version(&self) -> &Version {
        &self.settings.version
    }

    fn settings(&self) -> Option<&Value> {
        self.settings.config.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn installed(name: &str) -> InstalledPlugin {
        InstalledPlugin {
            name: name.to_string(),
            version: Version::new(0, 1, 0),
            location: PathBuf::from("/plugins").join(name),
            metadata: Value::Null,
        }
    }

    #[test]
    fn builtin_loader_constructs_clients() {
        let loader = StaticPluginLoader::with_builtin();
        let plugin = loader.load(&installed("aws")).unwrap();
        let client = plugin
            .construct(ProviderSettings {
                provider: "aws".into(),
                version: Version::new(0, 1, 0),
                config: Some(json!({"regions": "us-east-1"})),
                dev_mode: false,
            })
            .unwrap();

        assert_eq!(client.name(), "aws");
        assert_eq!(client.settings().unwrap()["regions"], "us-east-1");
    }

    #[test]
    fn unknown_plugin_fails_to_load() {
        let loader = StaticPluginLoader::with_builtin();
        let err = loader.load(&installed("oracle")).err().unwrap();
        assert!(matches!(err, CgError::PluginLoad { .. }));
    }

    #[test]
    fn non_object_settings_are_rejected() {
        let plugin = BundledProvider;
        let result = plugin.construct(ProviderSettings {
            provider: "gcp".into(),
            version: Version::new(1, 0, 0),
            config: Some(json!("oops")),
            dev_mode: true,
        });
        assert!(result.is_err());
    }
}
