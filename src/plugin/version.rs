use crate::error::{CgError, Result};
use semver::{Version, VersionReq};
use std::fmt;

/// Sentinel accepted wherever a version token is expected.
pub const LATEST: &str = "latest";

/// Parsed form of a user supplied version token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSpec {
    Latest,
    Exact(Version),
    Range(VersionReq),
}

impl VersionSpec {
    pub fn parse(token: &str) -> Result<Self> {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(invalid(token, "version is empty"));
        }

        if trimmed.eq_ignore_ascii_case(LATEST) {
            return Ok(VersionSpec::Latest);
        }

        let bare = trimmed.strip_prefix('v').unwrap_or(trimmed);
        if let Ok(version) = Version::parse(bare) {
            return Ok(VersionSpec::Exact(version));
        }

        VersionReq::parse(trimmed)
            .map(VersionSpec::Range)
            .map_err(|e| invalid(token, &e.to_string()))
    }

    /// Whether an installed version already fulfils this spec.
    ///
    /// `Latest` can only be answered with knowledge of what "latest" currently
    /// is, so callers pass the version they last resolved it to.
    pub fn is_satisfied_by(&self, installed: &Version, known_latest: Option<&Version>) -> bool {
        match self {
            VersionSpec::Latest => known_latest.is_some_and(|latest| latest == installed),
            VersionSpec::Exact(version) => version == installed,
            VersionSpec::Range(req) => req.matches(installed),
        }
    }

    /// Pick the version to install out of the versions a registry publishes.
    pub fn select(&self, available: &[Version], latest_tag: Option<&Version>) -> Option<Version> {
        match self {
            VersionSpec::Latest => latest_tag
                .cloned()
                .or_else(|| available.iter().filter(|v| is_stable(v)).max().cloned()),
            VersionSpec::Exact(version) => available.iter().find(|v| *v == version).cloned(),
            VersionSpec::Range(req) => available.iter().filter(|v| req.matches(v)).max().cloned(),
        }
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSpec::Latest => f.write_str(LATEST),
            VersionSpec::Exact(version) => write!(f, "{version}"),
            VersionSpec::Range(req) => write!(f, "{req}"),
        }
    }
}

pub fn is_stable(version: &Version) -> bool {
    version.pre.is_empty()
}

/// Parse a version string, tolerating a leading `v`.
pub fn parse_version(raw: &str) -> Option<Version> {
    let trimmed = raw.trim();
    Version::parse(trimmed.strip_prefix('v').unwrap_or(trimmed)).ok()
}

fn invalid(token: &str, reason: &str) -> CgError {
    CgError::InvalidVersionSpec {
        token: token.to_string(),
        reason: reason.to_string(),
    }
}
