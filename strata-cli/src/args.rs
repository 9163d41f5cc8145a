use std::path::PathBuf;

use clap::Args;

use crate::output::OutputFormat;

#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

#[derive(Debug, Args, Clone)]
pub struct VarsArgs {
    /// JSON or YAML file of caller-resolved variables.
    #[arg(long)]
    pub vars: Option<PathBuf>,
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set_vars: Vec<String>,
}

#[derive(Debug, Args, Clone)]
pub struct SecretsArgs {
    /// Secret source; `env` reads STRATA_SECRET_<NODE>_<KEY>.
    #[arg(long, default_value = "env")]
    pub secrets: String,
}

#[derive(Debug, Args, Clone)]
pub struct ConcurrencyArgs {
    #[arg(long, default_value_t = 10)]
    pub max_concurrency: usize,
}
