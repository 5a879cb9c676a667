//! certsweep CLI library

pub mod backend;
pub mod commands;
pub mod config;
pub mod error;
pub mod progress;
pub mod report;

pub use error::{Error, Result};

use clap::{Parser, Subcommand};

/// certsweep - find out who signed the TLS certificates across your clusters
#[derive(Parser, Debug)]
#[command(name = "certsweep")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan every context's services and report their certificate issuers
    Scan(commands::scan::ScanArgs),
    /// List the contexts a scan would visit
    Contexts(commands::contexts::ContextsArgs),
}

impl Cli {
    /// Log level used when neither `--verbose` nor `RUST_LOG` is set.
    ///
    /// A live progress bar shares stderr with the logs, so scans that draw one
    /// only log warnings by default.
    pub fn default_log_level(&self) -> &'static str {
        match &self.command {
            Commands::Scan(args) if !args.no_progress => "warn",
            _ => "info",
        }
    }

    /// Run the CLI command
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Scan(args) => commands::scan::run(args).await,
            Commands::Contexts(args) => commands::contexts::run(args).await,
        }
    }
}
