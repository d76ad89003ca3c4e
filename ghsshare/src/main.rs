//! ghsshare: encrypt for a GitHub user's SSH key, or decrypt with your own
use clap::Parser;
use colored::Colorize;
use ghsshare::Args;
use std::io;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let result = {
        let stdin = io::stdin();
        let stdout = io::stdout();
        ghsshare::run(&args, &mut stdin.lock(), &mut stdout.lock())
    };

    if let Err(err) = result {
        eprintln!("{}: {:#}", "error".red().bold(), err);
        process::exit(1);
    }
}

/// Logs go to stderr, stdout carries the payload
fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "warn,ghkeys=debug,ghsshare=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();
}
