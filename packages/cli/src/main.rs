mod commands;
mod script;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{apply, init, serve, ApplyArgs, InitArgs, ServeArgs};
use tracing_subscriber::EnvFilter;

/// Scribe CLI - script the structured document editor
#[derive(Parser, Debug)]
#[command(name = "scribe")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default config and an example document
    Init(InitArgs),

    /// Run an edit script over a document and print the result
    Apply(ApplyArgs),

    /// Start the history server
    Serve(ServeArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = std::env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|cwd| {
            let cwd = cwd.display().to_string();
            match cli.command {
                Command::Init(args) => init(args, &cwd),
                Command::Apply(args) => apply(args, &cwd),
                Command::Serve(args) => serve(args),
            }
        });

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
