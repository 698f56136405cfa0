use crate::agents::ProviderClientCache;
use crate::config::{
    ConfigDiscovery, ConfigResolver, DEFAULT_STORAGE_ENGINE, DiscoveredConfig, FlagInput,
    ResolvedConfig, ValueSource,
};
use crate::error::Result;
use crate::npm::RegistryInstaller;
use crate::plugin::installer::default_plugin_root;
use crate::plugin::{
    Installer, LocalInstaller, LockStore, PluginLoader, PluginResolver, ProviderClient,
    StaticPluginLoader,
};
use crate::reporter::Reporter;
use crate::storage::{StorageEngine, StorageEngineRegistry};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

const WELCOME_MESSAGE: &str = "Welcome to CloudGraph! No cloud-graph config file was found. \
     Run `cg init` to create one.";

/// Global flags every command accepts
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub dev: bool,
    pub dgraph: Option<String>,
    pub storage: Option<String>,
    pub directory: Option<String>,
}

impl GlobalOptions {
    pub fn flag_input(&self) -> FlagInput {
        FlagInput {
            host: self.dgraph.clone(),
            storage_engine: self.storage.clone(),
            directory: self.directory.clone(),
        }
    }
}

/// State scoped to one command invocation: resolved configuration, the lock
/// file and the storage/provider instance caches.
pub struct RunContext {
    options: GlobalOptions,
    working_dir: PathBuf,
    reporter: Arc<dyn Reporter>,
    discovered: OnceLock<Option<DiscoveredConfig>>,
    resolved: OnceLock<ResolvedConfig>,
    resolver: Arc<PluginResolver>,
    storage: StorageEngineRegistry,
    clients: ProviderClientCache,
}

impl RunContext {
    pub fn new(
        options: GlobalOptions,
        working_dir: PathBuf,
        reporter: Arc<dyn Reporter>,
        lock: Arc<LockStore>,
        installer: Arc<dyn Installer>,
        loader: Arc<dyn PluginLoader>,
        storage: StorageEngineRegistry,
    ) -> Self {
        let resolver = Arc::new(PluginResolver::new(lock, installer));
        let clients =
            ProviderClientCache::new(resolver.clone(), loader, reporter.clone(), options.dev);

        Self {
            options,
            working_dir,
            reporter,
            discovered: OnceLock::new(),
            resolved: OnceLock::new(),
            resolver,
            storage,
            clients,
        }
    }

    /// Wire up the default collaborators for a CLI run.
    pub fn for_cli(options: GlobalOptions, reporter: Arc<dyn Reporter>) -> Result<Self> {
        let working_dir = std::env::current_dir()?;
        let installer: Arc<dyn Installer> = if options.dev {
            Arc::new(LocalInstaller::new(working_dir.join("plugins")))
        } else {
            Arc::new(RegistryInstaller::new(
                &RegistryInstaller::default_registry(),
                default_plugin_root(),
            )?)
        };

        Ok(Self::new(
            options,
            working_dir,
            reporter,
            Arc::new(LockStore::new(LockStore::default_path())),
            installer,
            Arc::new(StaticPluginLoader::with_builtin()),
            StorageEngineRegistry::with_builtin(),
        ))
    }

    pub fn reporter(&self) -> &dyn Reporter {
        self.reporter.as_ref()
    }

    pub fn resolver(&self) -> &PluginResolver {
        &self.resolver
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// The config file found from the working directory upward, searched once
    /// per run. Prints the onboarding message when there is none.
    pub fn discovered_config(&self) -> Result<Option<&DiscoveredConfig>> {
        if let Some(found) = self.discovered.get() {
            return Ok(found.as_ref());
        }

        let found = ConfigDiscovery::search(&self.working_dir)?;
        match &found {
            Some(discovered) => {
                tracing::debug!(path = %discovered.path.display(), "using config file")
            }
            None => self.reporter.info(&WELCOME_MESSAGE.cyan().to_string()),
        }

        Ok(self.discovered.get_or_init(|| found).as_ref())
    }

    pub fn resolved_config(&self) -> Result<&ResolvedConfig> {
        if let Some(config) = self.resolved.get() {
            return Ok(config);
        }

        let file = self.discovered_config()?.map(|d| &d.config);
        let config = ConfigResolver::resolve(&self.options.flag_input(), file);

        if config.storage_engine == DEFAULT_STORAGE_ENGINE {
            self.reporter
                .info(&format!("Dgraph host set as: {}", config.host));
        }
        if config.origins.directory != ValueSource::Default {
            tracing::debug!(directory = %config.directory, source = %config.origins.directory, "data directory");
        }

        Ok(self.resolved.get_or_init(|| config))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        Ok(self.resolved_config()?.data_dir(&self.working_dir))
    }

    /// A relative input path that does not exist under the working directory
    /// is looked up in the data directory.
    pub fn locate_input(&self, file: &Path) -> Result<PathBuf> {
        let direct = self.working_dir.join(file);
        if file.is_absolute() || direct.exists() {
            return Ok(direct);
        }

        let in_data_dir = self.data_dir()?.join(file);
        if in_data_dir.exists() {
            tracing::debug!(path = %in_data_dir.display(), "using input from data directory");
            return Ok(in_data_dir);
        }
        Ok(direct)
    }

    pub fn storage_engine(&self) -> Result<Arc<dyn StorageEngine>> {
        let config = self.resolved_config()?;
        self.storage.get(&config.storage_engine, config)
    }

    pub fn storage_engine_names(&self) -> Vec<&str> {
        self.storage.engine_names()
    }

    pub fn provider_client(&self, provider: &str) -> Result<Option<Arc<dyn ProviderClient>>> {
        let config = self.resolved_config()?;
        Ok(self.clients.get_client(provider, config))
    }

    pub fn close(&self) -> Result<()> {
        self.storage.close_all()
    }
}
