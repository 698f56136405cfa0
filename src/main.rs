mod agents;
mod cli;
mod config;
mod context;
mod error;
mod logging;
mod npm;
mod plugin;
mod reporter;
mod storage;
#[cfg(test)]
mod testing;
mod workflow;

use clap::Parser;
use cli::{Cli, Commands, ProviderCommands, StorageCommands};
use colored::Colorize;
use context::RunContext;
use error::Result;
use reporter::ConsoleReporter;
use std::process;
use std::sync::Arc;

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let ctx = RunContext::for_cli(cli.global_options(), Arc::new(ConsoleReporter::new()))?;

    match cli.command {
        Commands::Provider { command } => match command {
            ProviderCommands::Update { providers } => workflow::execute_update(&ctx, &providers),
            ProviderCommands::Add { providers } => workflow::execute_add(&ctx, &providers),
            ProviderCommands::List => workflow::execute_list(&ctx),
        },
        Commands::Update { providers } => workflow::execute_update(&ctx, &providers),
        Commands::Storage { command } => match command {
            StorageCommands::Query { query } => workflow::execute_storage_query(&ctx, &query),
            StorageCommands::Write { file } => workflow::execute_storage_write(&ctx, &file),
        },
        Commands::Config => workflow::execute_config(&ctx),
    }
}
