use crate::context::GlobalOptions;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "cg",
    about = "CloudGraph - manage provider plugins and storage engines for your cloud inventory graph",
    version,
    author
)]
pub struct Cli {
    /// Turn on developer mode (plugins are resolved from ./plugins)
    #[arg(long, global = true)]
    pub dev: bool,

    /// Set where dgraph is running (default http://localhost:8080)
    #[arg(short = 'd', long, env = "DGRAPH_HOST", global = true, value_name = "HOST")]
    pub dgraph: Option<String>,

    /// Select a storage engine to use. Currently only supports dgraph
    #[arg(short = 's', long, global = true, value_name = "ENGINE")]
    pub storage: Option<String>,

    /// Set the folder where CloudGraph will store data (default cg)
    #[arg(long, global = true, value_name = "DIR")]
    pub directory: Option<String>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn global_options(&self) -> GlobalOptions {
        GlobalOptions {
            dev: self.dev,
            dgraph: self.dgraph.clone(),
            storage: self.storage.clone(),
            directory: self.directory.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage provider plugins
    Provider {
        #[command(subcommand)]
        command: ProviderCommands,
    },

    /// Update currently installed providers (alias of `provider update`)
    Update {
        /// Providers to update, as `name` or `name@version`
        #[arg(value_name = "PROVIDER")]
        providers: Vec<String>,
    },

    /// Work with the configured storage engine
    Storage {
        #[command(subcommand)]
        command: StorageCommands,
    },

    /// Show the resolved configuration and where each value came from
    Config,
}

#[derive(Subcommand, Debug)]
pub enum ProviderCommands {
    /// Update currently installed providers (all of them when none are given)
    Update {
        /// Providers to update, as `name` or `name@version`
        #[arg(value_name = "PROVIDER")]
        providers: Vec<String>,
    },

    /// Install providers that are missing and load their clients
    Add {
        /// Providers to add, as `name` or `name@version`
        #[arg(value_name = "PROVIDER", required = true)]
        providers: Vec<String>,
    },

    /// List installed providers from the lock file
    List,
}

#[derive(Subcommand, Debug)]
pub enum StorageCommands {
    /// Run a DQL query against the storage engine and print the result
    Query {
        #[arg(value_name = "QUERY")]
        query: String,
    },

    /// Write the JSON mutation in FILE to the storage engine
    Write {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}
