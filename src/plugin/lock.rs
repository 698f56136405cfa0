use crate::error::{CgError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

pub const LOCK_FILE_NAME: &str = ".cloud-graph.lock.json";

/// One installed provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockEntry {
    #[serde(skip)]
    pub provider: String,
    #[serde(rename = "version")]
    pub installed_version: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
}

impl LockEntry {
    pub fn new(provider: impl Into<String>, installed_version: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            installed_version: installed_version.into(),
            metadata: Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Provider name -> installed version, as persisted on disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LockFile {
    #[serde(default)]
    provider: BTreeMap<String, LockEntry>,
}

impl LockFile {
    pub fn get(&self, provider: &str) -> Option<&LockEntry> {
        self.provider.get(provider)
    }

    pub fn contains(&self, provider: &str) -> bool {
        self.provider.contains_key(provider)
    }

    pub fn insert(&mut self, entry: LockEntry) {
        self.provider.insert(entry.provider.clone(), entry);
    }

    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.provider.keys().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = &LockEntry> {
        self.provider.values()
    }

    pub fn len(&self) -> usize {
        self.provider.len()
    }

    pub fn is_empty(&self) -> bool {
        self.provider.is_empty()
    }

    fn restore_keys(mut self) -> Self {
        for (name, entry) in self.provider.iter_mut() {
            entry.provider = name.clone();
        }
        self
    }
}

/// Reads and writes the lock file, caching it for the rest of the run.
///
/// Writers are serialized and every save replaces the file through a rename,
/// so a reader only ever sees a complete mapping.
pub struct LockStore {
    path: PathBuf,
    cached: Mutex<Option<LockFile>>,
    writer: Mutex<()>,
}

impl LockStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            cached: Mutex::new(None),
            writer: Mutex::new(()),
        }
    }

    /// `CG_LOCK_FILE`, or the lock file in the platform config directory.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var("CG_LOCK_FILE") {
            return PathBuf::from(path);
        }

        directories::ProjectDirs::from("", "", "cloudgraph")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
            .join(LOCK_FILE_NAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<LockFile> {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(lock) = cached.as_ref() {
            return Ok(lock.clone());
        }

        let lock = self.read_from_disk()?;
        *cached = Some(lock.clone());
        Ok(lock)
    }

    pub fn get(&self, provider: &str) -> Result<Option<LockEntry>> {
        Ok(self.load()?.get(provider).cloned())
    }

    pub fn save(&self, lock: &LockFile) -> Result<()> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        self.store(lock)
    }

    /// Insert or replace one entry and persist the whole mapping.
    pub fn upsert(&self, entry: LockEntry) -> Result<()> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = self.load()?;
        next.insert(entry);
        self.store(&next)
    }

    // Callers hold `writer`.
    fn store(&self, lock: &LockFile) -> Result<()> {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        self.write_atomic(lock)?;
        *cached = Some(lock.clone());
        Ok(())
    }

    fn read_from_disk(&self) -> Result<LockFile> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "no lock file yet");
            return Ok(LockFile::default());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            CgError::LockFile(format!("Failed to read {}: {e}", self.path.display()))
        })?;

        if content.trim().is_empty() {
            return Ok(LockFile::default());
        }

        let lock: LockFile = serde_json::from_str(&content).map_err(|e| {
            CgError::LockFile(format!("Failed to parse {}: {e}", self.path.display()))
        })?;

        Ok(lock.restore_keys())
    }

    fn write_atomic(&self, lock: &LockFile) -> Result<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;

        let mut temp = tempfile::NamedTempFile::new_in(&parent)?;
        serde_json::to_writer_pretty(&mut temp, lock)?;
        temp.write_all(b"\n")?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| {
            CgError::LockFile(format!("Failed to replace {}: {}", self.path.display(), e.error))
        })?;

        tracing::debug!(path = %self.path.display(), providers = lock.len(), "lock file saved");
        Ok(())
    }
}
