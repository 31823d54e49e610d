use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Migration Composer - validate deployment context and compose migration units
#[derive(Parser)]
#[command(name = "migration-composer")]
#[command(about = "Validates migration deployment context and composes the enabled units")]
#[command(version)]
pub struct Cli {
    /// Print machine-readable JSON instead of a summary
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Context file selection shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct ContextArgs {
    /// Path to the JSON context file
    pub file: PathBuf,

    /// Named context block inside the file
    #[arg(short = 'c', long)]
    pub context_id: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a context file and print the effective configuration
    Validate {
        #[command(flatten)]
        context: ContextArgs,
    },
    /// Show which units would be built, in order
    Plan {
        #[command(flatten)]
        context: ContextArgs,
    },
    /// Compose every enabled unit against the dry-run provisioner
    Compose {
        #[command(flatten)]
        context: ContextArgs,

        /// Write the composition as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}
