//! Fakes shared by unit tests.

use crate::error::{CgError, Result};
use crate::plugin::installer::{InstalledPlugin, Installer};
use crate::plugin::version::VersionSpec;
use crate::reporter::Reporter;
use semver::Version;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;

/// Installer that resolves versions from a table and records every call.
pub struct FakeInstaller {
    latest: HashMap<String, Version>,
    failing: HashSet<String>,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeInstaller {
    pub fn new() -> Self {
        Self {
            latest: HashMap::new(),
            failing: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_latest(mut self, name: &str, version: &str) -> Self {
        self.latest
            .insert(name.to_string(), Version::parse(version).unwrap());
        self
    }

    pub fn failing_for(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn installed_names(&self) -> Vec<String> {
        self.calls().into_iter().map(|(name, _)| name).collect()
    }
}

impl Installer for FakeInstaller {
    fn install(&self, name: &str, requested: &VersionSpec) -> Result<InstalledPlugin> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), requested.to_string()));

        if self.failing.contains(name) {
            return Err(CgError::Io(std::io::Error::other("simulated network failure")));
        }

        let latest = self
            .latest
            .get(name)
            .cloned()
            .unwrap_or_else(|| Version::new(1, 0, 0));
        let version = match requested {
            VersionSpec::Latest => latest,
            VersionSpec::Exact(version) => version.clone(),
            VersionSpec::Range(req) if req.matches(&latest) => latest,
            VersionSpec::Range(req) => {
                return Err(CgError::InstallFailure {
                    provider: name.to_string(),
                    version: req.to_string(),
                    reason: "no matching version".to_string(),
                });
            }
        };

        Ok(InstalledPlugin {
            name: name.to_string(),
            location: self.location(name, &version),
            metadata: json!({ "source": "fake" }),
            version,
        })
    }

    fn location(&self, name: &str, version: &Version) -> PathBuf {
        PathBuf::from("/fake-plugins")
            .join(name)
            .join(version.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportEvent {
    Info(String),
    Warn(String),
    Error(String),
    SpinnerStart(String),
    SpinnerSuccess(String),
    SpinnerStop,
}

/// Reporter that keeps every event for later assertions.
#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ReportEvent>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReportEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ReportEvent::Warn(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn infos(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ReportEvent::Info(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: ReportEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl Reporter for RecordingReporter {
    fn info(&self, message: &str) {
        self.push(ReportEvent::Info(message.to_string()));
    }

    fn warn(&self, message: &str) {
        self.push(ReportEvent::Warn(message.to_string()));
    }

    fn error(&self, message: &str) {
        self.push(ReportEvent::Error(message.to_string()));
    }

    fn start_spinner(&self, message: &str) {
        self.push(ReportEvent::SpinnerStart(message.to_string()));
    }

    fn success_spinner(&self, message: &str) {
        self.push(ReportEvent::SpinnerSuccess(message.to_string()));
    }

    fn stop_spinner(&self) {
        self.push(ReportEvent::SpinnerStop);
    }
}
