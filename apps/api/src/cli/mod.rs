//! Command-line interface for the `diversia` binary.

mod commands;

use clap::{Parser, Subcommand};

pub use commands::{CheckCommand, DeployCommand, ImportCommand};

/// diversia - CRM for inclusive employment
///
/// Serves the CRM API and bundles the maintenance tasks that go with it:
/// bulk CSV import, pre-deployment checks and hosting migration files.
#[derive(Debug, Parser)]
#[command(name = "diversia")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// The command to execute (defaults to `serve`)
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API
    Serve,

    /// Import companies from a CSV file into the configured store
    Import(ImportCommand),

    /// Check form templates and frontend sources for expected fields and routes
    Check(CheckCommand),

    /// Write deployment files and stop the application being replaced
    Deploy(DeployCommand),
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Serve)
    }
}
