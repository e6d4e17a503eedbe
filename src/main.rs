//! bundlesync - vim bundle synchronizer
//!
//! Keeps the bundle directory of a vim installation in line with the Bundle
//! directives of a vimrc: clones what is missing, moves checkouts to the
//! declared refs, and quarantines what is no longer declared.

use clap::Parser;
use miette::Diagnostic;
use tracing_subscriber::EnvFilter;

mod activity_log;
mod cli;
mod commands;
mod common;
mod config;
mod domain;
mod error;
mod git;
mod listing;
mod manifest;
mod operations;
mod progress;
mod reconcile;
mod resolver;
mod scanner;
mod synchronizer;
mod trash;

use cli::{Cli, Commands};

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "bundlesync=debug"
    } else {
        "bundlesync=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    let result = match &cli.command {
        None | Some(Commands::Sync) => commands::sync::run(&cli.global),
        Some(Commands::Plan(args)) => commands::plan::run(&cli.global, args),
        Some(Commands::Completions(args)) => commands::completions::run(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        if let Some(help) = e.help() {
            eprintln!("  help: {}", help);
        }
        std::process::exit(e.exit_code());
    }
}
