use crate::config::{
    ConfigFile, ConfigOrigins, DEFAULT_DIRECTORY, DEFAULT_HOST, DEFAULT_STORAGE_ENGINE, FlagInput,
    ResolvedConfig, ValueSource,
};

/// Merges flags, config file and compiled defaults, field by field.
pub struct ConfigResolver;

impl ConfigResolver {
    pub fn resolve(flags: &FlagInput, file: Option<&ConfigFile>) -> ResolvedConfig {
        let section = file.map(|f| &f.cloud_graph);

        let (host, host_source) = pick(
            flags.host.as_deref(),
            section.and_then(|s| s.dgraph_host.as_deref()),
            DEFAULT_HOST,
        );
        let (storage_engine, storage_source) = pick(
            flags.storage_engine.as_deref(),
            section.and_then(|s| s.storage.as_deref()),
            DEFAULT_STORAGE_ENGINE,
        );
        let (directory, directory_source) = pick(
            flags.directory.as_deref(),
            section.and_then(|s| s.directory.as_deref()),
            DEFAULT_DIRECTORY,
        );

        ResolvedConfig {
            host,
            storage_engine,
            directory,
            provider_config: file.map(|f| f.providers.clone()).unwrap_or_default(),
            origins: ConfigOrigins {
                host: host_source,
                storage_engine: storage_source,
                directory: directory_source,
            },
        }
    }
}

// Blank values count as unset, same as an absent flag.
fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn pick(flag: Option<&str>, file: Option<&str>, default: &str) -> (String, ValueSource) {
    if let Some(value) = present(flag) {
        (value.to_string(), ValueSource::Flag)
    } else if let Some(value) = present(file) {
        (value.to_string(), ValueSource::File)
    } else {
        (default.to_string(), ValueSource::Default)
    }
}
