use crate::error::{CgError, Result};
use crate::plugin::installer::{InstalledPlugin, Installer};
use crate::plugin::lock::{LockEntry, LockStore};
use crate::plugin::reference::ProviderReference;
use crate::plugin::version::{VersionSpec, parse_version};
use semver::Version;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// What resolving a reference had to do
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionOutcome {
    /// The installer ran and the lock file now records the new version.
    Installed { previous: Option<String> },
    /// The locked version already satisfied the request.
    Satisfied,
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub plugin: InstalledPlugin,
    pub outcome: ResolutionOutcome,
}

/// Decides whether a provider reference needs an install and keeps the lock
/// file in step with what the installer reports.
pub struct PluginResolver {
    lock: Arc<LockStore>,
    installer: Arc<dyn Installer>,
    resolved_latest: Mutex<HashMap<String, Version>>,
}

impl PluginResolver {
    pub fn new(lock: Arc<LockStore>, installer: Arc<dyn Installer>) -> Self {
        Self {
            lock,
            installer,
            resolved_latest: Mutex::new(HashMap::new()),
        }
    }

    pub fn lock_store(&self) -> &LockStore {
        &self.lock
    }

    pub fn resolve_plugin(&self, reference: &ProviderReference) -> Result<Resolution> {
        let requested = reference.version()?;
        let name = reference.name.as_str();
        let existing = self.lock.get(name)?;

        if let Some(entry) = &existing {
            if let Some(installed) = parse_version(&entry.installed_version) {
                let known_latest = self.known_latest(name);
                if requested.is_satisfied_by(&installed, known_latest.as_ref()) {
                    tracing::debug!(provider = name, %installed, %requested, "already satisfied");
                    return Ok(Resolution {
                        plugin: InstalledPlugin {
                            name: name.to_string(),
                            location: self.installer.location(name, &installed),
                            metadata: entry.metadata.clone(),
                            version: installed,
                        },
                        outcome: ResolutionOutcome::Satisfied,
                    });
                }
            } else {
                tracing::warn!(
                    provider = name,
                    version = %entry.installed_version,
                    "locked version is not valid semver, reinstalling"
                );
            }
        }

        tracing::info!(provider = name, %requested, "installing plugin");
        let plugin = self
            .installer
            .install(name, &requested)
            .map_err(|e| install_failure(name, &requested, e))?;

        if requested == VersionSpec::Latest {
            self.resolved_latest
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(name.to_string(), plugin.version.clone());
        }

        let unchanged = existing
            .as_ref()
            .and_then(|entry| parse_version(&entry.installed_version))
            .is_some_and(|locked| locked == plugin.version);
        if unchanged {
            tracing::debug!(provider = name, version = %plugin.version, "installer returned the locked version");
            return Ok(Resolution {
                plugin,
                outcome: ResolutionOutcome::Satisfied,
            });
        }

        // The lock file only changes once the installer has succeeded.
        self.lock.upsert(
            LockEntry::new(name, plugin.version.to_string()).with_metadata(plugin.metadata.clone()),
        )?;

        Ok(Resolution {
            plugin,
            outcome: ResolutionOutcome::Installed {
                previous: existing.map(|entry| entry.installed_version),
            },
        })
    }

    /// Resolve at the locked version when there is one, installing the latest
    /// release otherwise.
    pub fn resolve_locked(&self, name: &str) -> Result<Resolution> {
        let locked = self
            .lock
            .get(name)?
            .and_then(|entry| parse_version(&entry.installed_version));
        let reference = ProviderReference::new(name, locked.map(|v| v.to_string()));
        self.resolve_plugin(&reference)
    }

    fn known_latest(&self, name: &str) -> Option<Version> {
        self.resolved_latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}

/// Every install error names the provider and the version that was asked for.
fn install_failure(provider: &str, requested: &VersionSpec, err: CgError) -> CgError {
    match err {
        CgError::InstallFailure { reason, .. } => CgError::InstallFailure {
            provider: provider.to_string(),
            version: requested.to_string(),
            reason,
        },
        other => CgError::InstallFailure {
            provider: provider.to_string(),
            version: requested.to_string(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::lock::LOCK_FILE_NAME;
    use crate::testing::FakeInstaller;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    fn setup(installer: FakeInstaller) -> (TempDir, Arc<FakeInstaller>, PluginResolver) {
        let dir = tempdir().unwrap();
        let lock = Arc::new(LockStore::new(dir.path().join(LOCK_FILE_NAME)));
        let installer = Arc::new(installer);
        let resolver = PluginResolver::new(lock, installer.clone());
        (dir, installer, resolver)
    }

    #[test]
    fn latest_twice_installs_once() {
        let (dir, installer, resolver) = setup(FakeInstaller::new().with_latest("aws", "0.12.0"));
        let aws = ProviderReference::parse("aws").unwrap();

        let first = resolver.resolve_plugin(&aws).unwrap();
        assert_eq!(first.outcome, ResolutionOutcome::Installed { previous: None });
        assert_eq!(first.plugin.version, Version::new(0, 12, 0));

        // A second write would recreate the file.
        let lock_path = dir.path().join(LOCK_FILE_NAME);
        fs::remove_file(&lock_path).unwrap();

        let second = resolver.resolve_plugin(&aws).unwrap();
        assert_eq!(second.outcome, ResolutionOutcome::Satisfied);
        assert_eq!(installer.call_count(), 1);
        assert!(!lock_path.exists());
    }

    #[test]
    fn latest_equal_to_locked_version_is_not_rewritten() {
        let (dir, installer, resolver) = setup(FakeInstaller::new().with_latest("aws", "0.12.0"));
        resolver
            .lock_store()
            .upsert(LockEntry::new("aws", "0.12.0"))
            .unwrap();
        let lock_path = dir.path().join(LOCK_FILE_NAME);
        let before = fs::read(&lock_path).unwrap();

        let aws = ProviderReference::parse("aws").unwrap();
        let resolution = resolver.resolve_plugin(&aws).unwrap();
        assert_eq!(resolution.outcome, ResolutionOutcome::Satisfied);
        assert_eq!(fs::read(&lock_path).unwrap(), before);

        // Known now, so the installer is not asked again.
        resolver.resolve_plugin(&aws).unwrap();
        assert_eq!(installer.call_count(), 1);
    }

    #[test]
    fn exact_version_already_locked_skips_installer() {
        let (_dir, installer, resolver) = setup(FakeInstaller::new());
        resolver
            .lock_store()
            .upsert(LockEntry::new("aws", "0.12.0"))
            .unwrap();

        let resolution = resolver
            .resolve_plugin(&ProviderReference::parse("aws@0.12.0").unwrap())
            .unwrap();
        assert_eq!(resolution.outcome, ResolutionOutcome::Satisfied);
        assert_eq!(installer.call_count(), 0);
    }

    #[test]
    fn newer_exact_version_updates_lock() {
        let (_dir, installer, resolver) = setup(FakeInstaller::new());
        resolver
            .lock_store()
            .upsert(LockEntry::new("aws", "0.11.0"))
            .unwrap();

        let resolution = resolver
            .resolve_plugin(&ProviderReference::parse("aws@0.12.0").unwrap())
            .unwrap();
        assert_eq!(
            resolution.outcome,
            ResolutionOutcome::Installed {
                previous: Some("0.11.0".to_string())
            }
        );
        assert_eq!(installer.calls(), vec![("aws".to_string(), "0.12.0".to_string())]);
        assert_eq!(
            resolver.lock_store().get("aws").unwrap().unwrap().installed_version,
            "0.12.0"
        );
    }

    #[test]
    fn failed_install_leaves_lock_file_untouched() {
        let (dir, _installer, resolver) = setup(FakeInstaller::new().failing_for("aws"));
        resolver
            .lock_store()
            .upsert(LockEntry::new("aws", "0.11.0"))
            .unwrap();
        let lock_path = dir.path().join(LOCK_FILE_NAME);
        let before = fs::read(&lock_path).unwrap();

        let err = resolver
            .resolve_plugin(&ProviderReference::parse("aws@0.12.0").unwrap())
            .unwrap_err();

        match err {
            CgError::InstallFailure {
                provider, version, ..
            } => {
                assert_eq!(provider, "aws");
                assert_eq!(version, "0.12.0");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fs::read(&lock_path).unwrap(), before);
        assert_eq!(
            resolver.lock_store().get("aws").unwrap().unwrap().installed_version,
            "0.11.0"
        );
    }

    #[test]
    fn failed_first_install_creates_no_entry() {
        let (dir, _installer, resolver) = setup(FakeInstaller::new().failing_for("gcp"));
        assert!(resolver.resolve_plugin(&ProviderReference::parse("gcp").unwrap()).is_err());
        assert!(!dir.path().join(LOCK_FILE_NAME).exists());
        assert!(resolver.lock_store().get("gcp").unwrap().is_none());
    }

    #[test]
    fn malformed_version_never_reaches_installer() {
        let (_dir, installer, resolver) = setup(FakeInstaller::new());
        let err = resolver
            .resolve_plugin(&ProviderReference::parse("aws@???").unwrap())
            .unwrap_err();
        assert!(matches!(err, CgError::InvalidVersionSpec { .. }));
        assert_eq!(installer.call_count(), 0);
    }

    #[test]
    fn resolve_locked_prefers_lock_file() {
        let (_dir, installer, resolver) = setup(FakeInstaller::new().with_latest("azure", "2.0.0"));
        resolver
            .lock_store()
            .upsert(LockEntry::new("aws", "0.12.0"))
            .unwrap();

        let aws = resolver.resolve_locked("aws").unwrap();
        assert_eq!(aws.outcome, ResolutionOutcome::Satisfied);
        assert_eq!(installer.call_count(), 0);

        let azure = resolver.resolve_locked("azure").unwrap();
        assert_eq!(azure.plugin.version, Version::new(2, 0, 0));
        assert_eq!(installer.calls(), vec![("azure".to_string(), "latest".to_string())]);
    }
}
