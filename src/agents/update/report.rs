use crate::error::{CgError, Result};
use crate::plugin::{ProviderReference, Resolution, ResolutionOutcome};

/// Lifecycle of one provider inside a batch update
#[derive(Debug)]
pub enum ProviderUpdateState {
    Pending,
    Resolving,
    Installed { from: Option<String>, to: String },
    Skipped { version: String },
    Failed(CgError),
}

impl ProviderUpdateState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProviderUpdateState::Installed { .. }
                | ProviderUpdateState::Skipped { .. }
                | ProviderUpdateState::Failed(_)
        )
    }
}

#[derive(Debug)]
pub struct ProviderUpdate {
    pub provider: String,
    pub requested: String,
    pub state: ProviderUpdateState,
}

impl ProviderUpdate {
    pub fn pending(reference: &ProviderReference) -> Self {
        Self {
            provider: reference.name.clone(),
            requested: reference.requested_version().to_string(),
            state: ProviderUpdateState::Pending,
        }
    }

    pub fn begin(&mut self) {
        if matches!(self.state, ProviderUpdateState::Pending) {
            self.state = ProviderUpdateState::Resolving;
        }
    }

    /// Move from `Resolving` to a terminal state.
    pub fn finish(&mut self, result: Result<Resolution>) {
        if !matches!(self.state, ProviderUpdateState::Resolving) {
            return;
        }

        self.state = match result {
            Ok(Resolution {
                plugin,
                outcome: ResolutionOutcome::Installed { previous },
            }) => ProviderUpdateState::Installed {
                from: previous,
                to: plugin.version.to_string(),
            },
            Ok(Resolution {
                plugin,
                outcome: ResolutionOutcome::Satisfied,
            }) => ProviderUpdateState::Skipped {
                version: plugin.version.to_string(),
            },
            Err(err) => ProviderUpdateState::Failed(err),
        };
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, ProviderUpdateState::Failed(_))
    }
}

/// Outcome of a batch update, one entry per attempted provider
#[derive(Debug, Default)]
pub struct UpdateReport {
    pub updates: Vec<ProviderUpdate>,
    /// Requested providers that are not in the lock file.
    pub not_locked: Vec<String>,
}

impl UpdateReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn installed(&self) -> impl Iterator<Item = &ProviderUpdate> {
        self.updates
            .iter()
            .filter(|u| matches!(u.state, ProviderUpdateState::Installed { .. }))
    }

    pub fn skipped(&self) -> impl Iterator<Item = &ProviderUpdate> {
        self.updates
            .iter()
            .filter(|u| matches!(u.state, ProviderUpdateState::Skipped { .. }))
    }

    pub fn failures(&self) -> impl Iterator<Item = &ProviderUpdate> {
        self.updates.iter().filter(|u| u.is_failed())
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// True when at least one provider was attempted and none succeeded.
    pub fn all_failed(&self) -> bool {
        !self.updates.is_empty() && self.updates.iter().all(ProviderUpdate::is_failed)
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::InstalledPlugin;
    use semver::Version;
    use serde_json::Value;
    use std::path::PathBuf;

    fn resolution(outcome: ResolutionOutcome) -> Resolution {
        Resolution {
            plugin: InstalledPlugin {
                name: "aws".into(),
                version: Version::new(0, 12, 0),
                location: PathBuf::from("/plugins/aws"),
                metadata: Value::Null,
            },
            outcome,
        }
    }

    #[test]
    fn state_machine_reaches_terminal_states() {
        let reference = ProviderReference::parse("aws").unwrap();

        let mut update = ProviderUpdate::pending(&reference);
        assert!(!update.state.is_terminal());
        update.begin();
        assert!(matches!(update.state, ProviderUpdateState::Resolving));
        update.finish(Ok(resolution(ResolutionOutcome::Installed {
            previous: Some("0.11.0".into()),
        })));
        assert!(update.state.is_terminal());
        assert!(matches!(
            &update.state,
            ProviderUpdateState::Installed { from: Some(from), to } if from == "0.11.0" && to == "0.12.0"
        ));

        let mut skipped = ProviderUpdate::pending(&reference);
        skipped.begin();
        skipped.finish(Ok(resolution(ResolutionOutcome::Satisfied)));
        assert!(matches!(skipped.state, ProviderUpdateState::Skipped { .. }));
    }

    #[test]
    fn finish_without_begin_is_ignored() {
        let reference = ProviderReference::parse("aws").unwrap();
        let mut update = ProviderUpdate::pending(&reference);
        update.finish(Err(CgError::Storage("boom".into())));
        assert!(matches!(update.state, ProviderUpdateState::Pending));
    }

    #[test]
    fn all_failed_needs_attempts() {
        let mut report = UpdateReport::new();
        assert!(!report.all_failed());

        let mut update = ProviderUpdate::pending(&ProviderReference::parse("aws").unwrap());
        update.begin();
        update.finish(Err(CgError::Storage("boom".into())));
        report.updates.push(update);
        assert!(report.all_failed());
        assert_eq!(report.failure_count(), 1);
    }
}
