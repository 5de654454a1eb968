mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::filter::EnvFilter;

use commands::RuntimeArgs;
use commands::repl::ReplCommand;
use commands::run::{RunCommand, eval_expr};
use config::load_config;

#[derive(Parser)]
#[command(
    name = "silc",
    version,
    about = "silc Lisp interpreter",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Files to load before the REPL starts
    files: Vec<PathBuf>,

    /// Evaluate an expression, print its value and exit
    #[arg(long, short = 'e', value_name = "EXPR")]
    eval: Option<String>,

    /// Path to silc.toml
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Log debug events
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(flatten)]
    runtime: RuntimeArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a file and exit
    Run(RunCommand),
    /// Start the interactive REPL
    Repl(ReplCommand),
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Run(cmd)) => cmd.run(&config, &cli.runtime),
        Some(Commands::Repl(cmd)) => cmd.run(&config, &cli.runtime),
        None => match cli.eval {
            Some(expr) => eval_expr(&cli.files, &expr, &config, &cli.runtime),
            None => ReplCommand { files: cli.files }.run(&config, &cli.runtime),
        },
    }
}
