//! spire-entry CLI library

pub mod commands;
pub mod error;

pub use error::{Error, Result};

use clap::{Parser, Subcommand};

/// spire-entry - SPIRE registration entries from ClusterSPIFFEID templates
#[derive(Parser, Debug)]
#[command(name = "spire-entry")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render the entry a ClusterSPIFFEID produces for a pod
    Render(commands::render::RenderArgs),
    /// Compile a ClusterSPIFFEID's templates and report problems
    Validate(commands::validate::ValidateArgs),
}

impl Cli {
    /// Run the CLI command
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Render(args) => commands::render::run(args),
            Commands::Validate(args) => commands::validate::run(args),
        }
    }
}
