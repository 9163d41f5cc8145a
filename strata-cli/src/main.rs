use clap::Parser;

mod args;
mod cmd;
mod commands;
mod exit_codes;
mod output;

pub use args::*;
use commands::Command;

#[derive(Debug, Parser)]
#[command(name = "strata", version, about = "Declarative dependency-graph engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create tokio runtime: {e}");
            std::process::exit(exit_codes::RUNTIME_ERROR);
        }
    };

    let exit_code = rt.block_on(run_command(cli.command));
    std::process::exit(exit_code);
}

async fn run_command(command: Command) -> i32 {
    match command {
        Command::Validate { path, output } => cmd::validate::validate_cmd(&path, output).await,
        Command::Plan {
            path,
            vars,
            diff_against,
            output,
        } => cmd::plan::plan_cmd(&path, &vars, diff_against.as_deref(), output).await,
        Command::Apply {
            path,
            vars,
            secrets,
            concurrency,
            dry_run,
            output,
        } => cmd::apply::apply_cmd(&path, &vars, &secrets, &concurrency, dry_run, output).await,
    }
}
