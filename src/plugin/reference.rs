use crate::error::{CgError, Result};
use crate::plugin::version::{LATEST, VersionSpec};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

const SEPARATOR: char = '@';

static PROVIDER_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").unwrap());

/// A provider as named on the command line: `aws` or `aws@0.12.0`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderReference {
    pub name: String,
    pub version_spec: Option<String>,
}

impl ProviderReference {
    /// Parse a raw token, splitting on the first `@`.
    pub fn parse(token: &str) -> Result<Self> {
        let token = token.trim();
        let (name, version_spec) = match token.split_once(SEPARATOR) {
            Some((name, version)) => (name, Some(version)),
            None => (token, None),
        };

        if name.is_empty() {
            return Err(invalid(token, "provider name is empty"));
        }

        if !PROVIDER_NAME.is_match(name) {
            return Err(invalid(
                token,
                "provider names may only contain letters, digits, '-' and '_'",
            ));
        }

        if version_spec.is_some_and(str::is_empty) {
            return Err(invalid(token, "version after '@' is empty"));
        }

        Ok(Self {
            name: name.to_string(),
            version_spec: version_spec.map(str::to_string),
        })
    }

    pub fn new(name: impl Into<String>, version_spec: Option<String>) -> Self {
        Self {
            name: name.into(),
            version_spec,
        }
    }

    /// The version token to resolve, `latest` when none was given.
    pub fn requested_version(&self) -> &str {
        self.version_spec.as_deref().unwrap_or(LATEST)
    }

    pub fn version(&self) -> Result<VersionSpec> {
        VersionSpec::parse(self.requested_version())
    }
}

impl fmt::Display for ProviderReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version_spec {
            Some(version) => write!(f, "{}{SEPARATOR}{version}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

fn invalid(token: &str, reason: &str) -> CgError {
    CgError::InvalidVersionSpec {
        token: token.to_string(),
        reason: reason.to_string(),
    }
}
