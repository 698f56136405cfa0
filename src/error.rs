use thiserror::Error;

#[derive(Error, Debug)]
pub enum CgError {
    #[error("Invalid version spec '{token}': {reason}")]
    InvalidVersionSpec { token: String, reason: String },

    #[error("Failed to install {provider}@{version}: {reason}")]
    InstallFailure {
        provider: String,
        version: String,
        reason: String,
    },

    #[error("Unknown storage engine '{0}'")]
    UnknownStorageEngine(String),

    #[error("{0} not found in lock file, have you installed it?")]
    ProviderNotLocked(String),

    #[error("Failed to load plugin for {provider}: {reason}")]
    PluginLoad { provider: String, reason: String },

    #[error("Invalid config file {path}: {reason}")]
    ConfigParse { path: String, reason: String },

    #[error("Lock file error: {0}")]
    LockFile(String),

    #[error("Storage engine error: {0}")]
    Storage(String),

    #[error("All {failed} provider update(s) failed")]
    UpdateFailed { failed: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, CgError>;
