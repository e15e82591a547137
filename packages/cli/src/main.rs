mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{convert, info, init, resolve, validate, ConvertArgs, InfoArgs, InitArgs, ResolveArgs, ValidateArgs};
use config::Config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Knecht CLI - inspect and resolve variant preset documents
#[derive(Parser, Debug)]
#[command(name = "knecht")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to knecht.config.json in the working directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default config file
    Init(InitArgs),

    /// Report dangling references, cycles and duplicate ids
    Validate(ValidateArgs),

    /// Print the flattened variant list of a preset
    Resolve(ResolveArgs),

    /// Re-encode an exchange file
    Convert(ConvertArgs),

    /// Summarize the contents of an exchange file
    Info(InfoArgs),
}

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli, cwd: &str) -> anyhow::Result<Config> {
    match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(cwd),
    }
}

fn main() {
    let cli = Cli::parse();

    let cwd = std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .display()
        .to_string();

    let config = match load_config(&cli, &cwd) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{} invalid config: {}", "Error:".red().bold(), err);
            std::process::exit(1);
        }
    };
    init_tracing(&config.log_level);

    let result = match cli.command {
        Command::Init(args) => init(args, &cwd),
        Command::Validate(args) => validate(args, &config),
        Command::Resolve(args) => resolve(args, &config),
        Command::Convert(args) => convert(args),
        Command::Info(args) => info(args),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
