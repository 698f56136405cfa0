use crate::agents::update::ProviderUpdateState;
use crate::agents::{UpdateOrchestrator, UpdateReport};
use crate::context::RunContext;
use crate::error::{CgError, Result};
use crate::plugin::{ProviderReference, ResolutionOutcome};
use crate::reporter::Reporter;
use colored::Colorize;
use std::path::Path;

/// Parse command line tokens, reporting and skipping the malformed ones.
pub fn parse_references(tokens: &[String], reporter: &dyn Reporter) -> Vec<ProviderReference> {
    tokens
        .iter()
        .filter_map(|token| match ProviderReference::parse(token) {
            Ok(reference) => Some(reference),
            Err(err) => {
                reporter.warn(&err.to_string());
                None
            }
        })
        .collect()
}

/// Execute `provider update`
pub fn execute_update(ctx: &RunContext, tokens: &[String]) -> Result<()> {
    ctx.resolved_config()?;
    let references = parse_references(tokens, ctx.reporter());
    if references.is_empty() && !tokens.is_empty() {
        return Err(CgError::UpdateFailed {
            failed: tokens.len(),
        });
    }

    println!("{}", "Updating installed providers...".cyan().bold());

    let orchestrator = UpdateOrchestrator::new(ctx.resolver(), ctx.reporter());
    let report = orchestrator.update_all(&references)?;

    print_update_report(&report);

    // Partial failures are reported but do not fail the command.
    if report.all_failed() {
        return Err(CgError::UpdateFailed {
            failed: report.failure_count(),
        });
    }
    Ok(())
}

fn print_update_report(report: &UpdateReport) {
    if report.is_empty() {
        println!("\n{}", "No providers were updated".yellow());
        return;
    }

    println!("\n{}", "Update Summary:".cyan().bold());
    for update in &report.updates {
        if !update.state.is_terminal() {
            continue;
        }
        match &update.state {
            ProviderUpdateState::Installed { from, to } => println!(
                "  • {} {} → {}",
                update.provider.white().bold(),
                from.as_deref().unwrap_or("none").red(),
                to.green()
            ),
            ProviderUpdateState::Skipped { version } => println!(
                "  • {} {} {}",
                update.provider.white().bold(),
                version.dimmed(),
                "(up to date)".dimmed()
            ),
            ProviderUpdateState::Failed(err) => println!(
                "  • {} {} {}",
                update.provider.white().bold(),
                format!("failed ({}):", update.requested).red(),
                err
            ),
            ProviderUpdateState::Pending | ProviderUpdateState::Resolving => {}
        }
    }

    println!(
        "\n  {} updated, {} up to date, {} failed",
        report.installed().count().to_string().green(),
        report.skipped().count().to_string().dimmed(),
        report.failure_count().to_string().red()
    );
}

/// Execute `provider add`
pub fn execute_add(ctx: &RunContext, tokens: &[String]) -> Result<()> {
    let references = parse_references(tokens, ctx.reporter());
    println!("{}", "Adding providers...".cyan().bold());

    let mut added = 0;
    for reference in &references {
        // Install or update to the requested version before building the client.
        if reference.version_spec.is_some() {
            ctx.reporter().start_spinner(&format!(
                "Installing {} provider at {} version",
                reference.name.italic().green(),
                reference.requested_version()
            ));
            match ctx.resolver().resolve_plugin(reference) {
                Ok(resolution) => {
                    let verb = match resolution.outcome {
                        ResolutionOutcome::Installed { .. } => "installed",
                        ResolutionOutcome::Satisfied => "already installed",
                    };
                    ctx.reporter().success_spinner(&format!(
                        "{}@{} {verb}",
                        reference.name, resolution.plugin.version
                    ));
                }
                Err(err) => {
                    ctx.reporter().stop_spinner();
                    ctx.reporter().warn(&err.to_string());
                    continue;
                }
            }
        }

        if let Some(client) = ctx.provider_client(&reference.name)? {
            let configured = if client.settings().is_some() {
                "configured"
            } else {
                "no config, run `cg init` to add one"
            };
            println!(
                "   {} {}",
                format!("✓ {} {} ready", client.name(), client.version()).green(),
                format!("({configured})").dimmed()
            );
            added += 1;
        }
    }

    println!(
        "\n{}",
        format!("{added} of {} provider(s) ready", references.len()).bold()
    );
    Ok(())
}

/// Execute `provider list`
pub fn execute_list(ctx: &RunContext) -> Result<()> {
    ctx.resolved_config()?;
    let lock = ctx.resolver().lock_store().load()?;
    println!(
        "{} {}",
        "Installed providers".cyan().bold(),
        format!("({})", ctx.resolver().lock_store().path().display()).dimmed()
    );

    if lock.is_empty() {
        println!("\n{}", "No providers installed yet. Try `cg provider add aws`.".yellow());
        return Ok(());
    }

    for entry in lock.entries() {
        let installed_at = entry
            .metadata
            .get("installedAt")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        println!(
            "  • {} {} {}",
            entry.provider.white().bold(),
            entry.installed_version.green(),
            installed_at.dimmed()
        );
    }

    println!("\n  {} providers", lock.len().to_string().yellow());
    Ok(())
}

/// Execute `storage query`
pub fn execute_storage_query(ctx: &RunContext, query: &str) -> Result<()> {
    let engine = ctx.storage_engine()?;
    tracing::debug!(engine = engine.name(), host = engine.host(), "running query");

    let result = engine.query(query)?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    ctx.close()
}

/// Execute `storage write`: send a JSON file as a mutation
pub fn execute_storage_write(ctx: &RunContext, file: &Path) -> Result<()> {
    let file = ctx.locate_input(file)?;
    let content = std::fs::read_to_string(&file)?;
    let mutation: serde_json::Value = serde_json::from_str(&content)?;

    let engine = ctx.storage_engine()?;
    ctx.reporter().start_spinner(&format!(
        "Writing {} to {}",
        file.display(),
        engine.host().bright_cyan()
    ));

    match engine.write(&mutation) {
        Ok(()) => ctx
            .reporter()
            .success_spinner(&format!("Data written to {}", engine.name())),
        Err(err) => {
            ctx.reporter().stop_spinner();
            return Err(err);
        }
    }

    ctx.close()
}

/// Execute `config`
pub fn execute_config(ctx: &RunContext) -> Result<()> {
    let discovered = ctx.discovered_config()?.map(|d| d.path.clone());
    let config = ctx.resolved_config()?;

    println!("{}", "Resolved configuration:".cyan().bold());
    println!(
        "  working dir: {}",
        ctx.working_dir().display().to_string().dimmed()
    );
    match discovered {
        Some(path) => println!("  config file: {}", path.display().to_string().dimmed()),
        None => println!("  config file: {}", "none".dimmed()),
    }
    println!(
        "  host:        {} {}",
        config.host.green(),
        format!("({})", config.origins.host).dimmed()
    );
    println!(
        "  storage:     {} {}",
        config.storage_engine.green(),
        format!("({})", config.origins.storage_engine).dimmed()
    );
    println!(
        "  engines:     {}",
        ctx.storage_engine_names().join(", ").dimmed()
    );
    println!(
        "  directory:   {} {} {}",
        config.directory.green(),
        format!("({})", config.origins.directory).dimmed(),
        ctx.data_dir()?.display().to_string().dimmed()
    );

    if !config.provider_config.is_empty() {
        let providers: Vec<&str> = config.provider_config.keys().map(String::as_str).collect();
        println!("  providers:   {}", providers.join(", ").bright_cyan());
    }
    Ok(())
}
