use std::path::PathBuf;

use clap::Subcommand;

use crate::args::*;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse a manifest and report every structural violation.
    Validate {
        path: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Build the ordered plan without touching any resource.
    Plan {
        path: PathBuf,
        #[command(flatten)]
        vars: VarsArgs,
        /// Previously saved plan JSON to diff the new plan against.
        #[arg(long = "diff-against")]
        diff_against: Option<PathBuf>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Plan and then apply tier by tier.
    Apply {
        path: PathBuf,
        #[command(flatten)]
        vars: VarsArgs,
        #[command(flatten)]
        secrets: SecretsArgs,
        #[command(flatten)]
        concurrency: ConcurrencyArgs,
        /// Resolve and echo placeholder outputs instead of applying.
        #[arg(long)]
        dry_run: bool,
        #[command(flatten)]
        output: OutputArgs,
    },
}
