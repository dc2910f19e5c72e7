mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{check, inspect, stamp, variables, CheckArgs, InspectArgs, StampArgs, VariablesArgs};
use std::path::PathBuf;

/// Elemental CLI - Inspect and maintain multi-channel notification templates
#[derive(Parser, Debug)]
#[command(name = "elemental")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding elemental.config.json (defaults to current directory)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarise a template's channels and variables
    Inspect(InspectArgs),

    /// Give every tracked block a unique id
    Stamp(StampArgs),

    /// Validate variable chips in templates
    Check(CheckArgs),

    /// List variable paths from example data
    Variables(VariablesArgs),
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_dir = match cli.config_dir.map(Ok).unwrap_or_else(std::env::current_dir) {
        Ok(dir) => dir,
        Err(err) => {
            eprintln!("{} Cannot get current directory: {}", "Error:".red().bold(), err);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Inspect(args) => inspect(args, &config_dir),
        Command::Stamp(args) => stamp(args, &config_dir),
        Command::Check(args) => check(args, &config_dir),
        Command::Variables(args) => variables(args),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
