use crate::agents::update::report::{ProviderUpdate, UpdateReport};
use crate::error::{CgError, Result};
use crate::plugin::{PluginResolver, ProviderReference, ResolutionOutcome};
use crate::reporter::Reporter;
use colored::Colorize;

/// Updates locked providers one at a time, never stopping on a failure.
pub struct UpdateOrchestrator<'a> {
    resolver: &'a PluginResolver,
    reporter: &'a dyn Reporter,
}

impl<'a> UpdateOrchestrator<'a> {
    pub fn new(resolver: &'a PluginResolver, reporter: &'a dyn Reporter) -> Self {
        Self { resolver, reporter }
    }

    /// With no references every locked provider is updated to latest.
    /// Otherwise only the named providers that are locked are updated,
    /// each to the version given in its own token when there is one.
    pub fn update_all(&self, requested: &[ProviderReference]) -> Result<UpdateReport> {
        let lock = self.resolver.lock_store().load()?;
        let mut report = UpdateReport::new();

        let targets: Vec<String> = lock
            .providers()
            .filter(|name| requested.is_empty() || requested.iter().any(|r| r.name == *name))
            .map(str::to_string)
            .collect();

        for reference in requested {
            if lock.contains(&reference.name) || report.not_locked.contains(&reference.name) {
                continue;
            }
            let err = CgError::ProviderNotLocked(reference.name.clone());
            tracing::warn!(provider = %reference.name, "{err}");
            self.reporter.warn(&format!(
                "{} not found in lock file, have you installed it?",
                reference.name.green()
            ));
            report.not_locked.push(reference.name.clone());
        }

        for provider in targets {
            let version = requested
                .iter()
                .filter(|r| r.name == provider)
                .find_map(|r| r.version_spec.clone());
            let reference = ProviderReference::new(provider, version);
            report.updates.push(self.update_one(&reference));
        }

        Ok(report)
    }

    fn update_one(&self, reference: &ProviderReference) -> ProviderUpdate {
        let name = reference.name.as_str();
        let version = reference.requested_version();
        let mut update = ProviderUpdate::pending(reference);

        update.begin();
        self.reporter.start_spinner(&format!(
            "Updating {} provider to {} version",
            name.italic().green(),
            version
        ));

        let result = self.resolver.resolve_plugin(reference);
        match &result {
            Ok(resolution) => match &resolution.outcome {
                ResolutionOutcome::Installed { .. } => {
                    self.reporter.success_spinner(&format!(
                        "{} provider updated successfully",
                        name.italic().green()
                    ));
                    self.reporter.info(&format!(
                        "Run {} to ensure you have the latest configuration for this version (including new services).",
                        format!("$ cg init {name}").italic().green()
                    ));
                }
                ResolutionOutcome::Satisfied => {
                    self.reporter.success_spinner(&format!(
                        "{} provider is already at {}",
                        name.italic().green(),
                        resolution.plugin.version
                    ));
                }
            },
            Err(err) => {
                self.reporter.stop_spinner();
                self.reporter
                    .warn(&format!("Could not update {name} to {version}: {err}"));
            }
        }

        update.finish(result);
        update
    }
}
