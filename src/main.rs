//! `kubectl-cfg`: add, delete, rename, merge and switch kubeconfig entries.
//!
//! Installed on `PATH` it also works as a kubectl plugin (`kubectl cfg ...`).

use std::io::IsTerminal;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use kubectl_cfg::{CfgError, Cli, DeleteObserver, PathOptions, Settings, handle};

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CfgError> {
    let settings = Settings::load()?;
    init_logging(&settings, cli.verbose);

    let access = PathOptions::new()
        .env_var(settings.kubeconfig_env())
        .default_path(settings.default_kubeconfig())
        .explicit_path(cli.kubeconfig)
        .build();
    let backup = settings.backup_observer();
    let observer = backup.as_ref().map(|b| b as &dyn DeleteObserver);

    let action = cli.command.into_action()?;
    let result = handle(&action, &access, observer)?;

    let output = result.to_string();
    if output.ends_with('\n') {
        print!("{output}");
    } else if !output.is_empty() {
        println!("{output}");
    }
    for warning in result.warnings() {
        eprintln!("warning: {warning}");
    }
    Ok(())
}

/// `RUST_LOG` wins over the settings file; `--verbose` wins over both.
fn init_logging(settings: &Settings, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log.level))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .try_init();
}
