use crate::config::ResolvedConfig;
use crate::error::Result;
use crate::plugin::{PluginLoader, PluginResolver, ProviderClient, ProviderSettings};
use crate::reporter::Reporter;
use colored::Colorize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Provider clients built during this run, at most one per provider.
pub struct ProviderClientCache {
    resolver: Arc<PluginResolver>,
    loader: Arc<dyn PluginLoader>,
    reporter: Arc<dyn Reporter>,
    dev_mode: bool,
    clients: Mutex<HashMap<String, Arc<dyn ProviderClient>>>,
}

impl ProviderClientCache {
    pub fn new(
        resolver: Arc<PluginResolver>,
        loader: Arc<dyn PluginLoader>,
        reporter: Arc<dyn Reporter>,
        dev_mode: bool,
    ) -> Self {
        Self {
            resolver,
            loader,
            reporter,
            dev_mode,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached client or builds it. Failures are reported as
    /// warnings and yield `None` so other providers can carry on.
    pub fn get_client(
        &self,
        provider: &str,
        config: &ResolvedConfig,
    ) -> Option<Arc<dyn ProviderClient>> {
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = clients.get(provider) {
            return Some(Arc::clone(client));
        }

        match self.build(provider, config) {
            Ok(client) => {
                clients.insert(provider.to_string(), Arc::clone(&client));
                Some(client)
            }
            Err(err) => {
                self.reporter.error(&err.to_string());
                self.reporter.warn(&format!(
                    "There was an error installing or requiring a plugin for {}, does one exist?",
                    provider.green()
                ));
                None
            }
        }
    }

    #[cfg(test)]
    pub fn cached(&self) -> usize {
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn build(&self, provider: &str, config: &ResolvedConfig) -> Result<Arc<dyn ProviderClient>> {
        let resolution = self.resolver.resolve_locked(provider)?;
        let plugin = self.loader.load(&resolution.plugin)?;

        let settings = config.provider_settings(provider).cloned();
        if settings.is_some() {
            self.reporter
                .info(&format!("Found config for {provider}, using..."));
        }

        plugin.construct(ProviderSettings {
            provider: provider.to_string(),
            version: resolution.plugin.version,
            config: settings,
            dev_mode: self.dev_mode,
        })
    }
}
