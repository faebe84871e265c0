use anyhow::{Context, Result};
use astest_runtime::RunError;
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod debugger;

use config::Config;

/// Run a script as a test suite, one test per `assert`.
///
/// Every `assert <expr>;` in FILE is reported as a numbered test. Failing
/// assertions show their source text. With --debug, a console opens at
/// each failing assertion with its variables in scope.
///
/// EXAMPLES:
///     astest checks.tst              Run the assertions in checks.tst
///     astest checks.tst --debug      Inspect failures interactively
///     astest checks.tst --dump-ast   Show the instrumented program
///
/// ENVIRONMENT VARIABLES:
///     NO_COLOR              Set to disable colored output
///     ASTEST_TERM_WIDTH     Fixed output width instead of the terminal's
///     ASTEST_HISTORY_FILE   Debug console history file
///     ASTEST_NO_HISTORY     Set to disable debug console history
///     ASTEST_LOG            Log filter, e.g. 'astest_runtime=trace'
#[derive(Parser, Debug)]
#[command(name = "astest")]
#[command(version)]
struct Cli {
    /// Script to run as a test suite
    file: PathBuf,
    /// Open a debug console on each failing assertion
    #[arg(long, short = 'd')]
    debug: bool,
    /// Disable colored output (NO_COLOR is read with the other settings)
    #[arg(long)]
    no_color: bool,
    /// Print the instrumented program as JSON and exit without running it
    #[arg(long)]
    dump_ast: bool,
    /// Verbose logging on stderr
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let config = Config::from_env();
    let color = !(cli.no_color || config.no_color);
    if !color {
        colored::control::set_override(false);
    }

    let outcome = if cli.dump_ast {
        commands::ast::run(&cli.file, cli.debug)
    } else {
        commands::run::run(&cli.file, cli.debug, color, &config).map(|_| ())
    };

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            print_error(&err);
            Ok(ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(1)))
        }
    }
}

fn init_tracing(verbose: bool) -> Result<()> {
    let filter = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("ASTEST_LOG")
                .unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .try_init()
        .context("failed to initialise logging")
}

/// Print a failed run to stderr
///
/// Errors carrying diagnostics print those; the rest get an `Error:` line.
fn print_error(err: &RunError) {
    let diagnostics = err.diagnostics();
    if diagnostics.is_empty() {
        eprintln!("{} {}", "Error:".red().bold(), err);
        return;
    }
    for diag in diagnostics {
        eprintln!("{}", diag.to_string().red());
    }
}
