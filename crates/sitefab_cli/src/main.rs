//! siteFab CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments or checklist
//! - 3: Generation failed

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Cli, Commands, Failure};
use sitefab_core::CoreError;
use sitefab_spec::SpecError;

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const GENERATION_FAILED: u8 = 3;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Generate(args) => commands::generate::execute(args, config, cli.quiet).await,
        Commands::Check(args) => commands::check::execute(args).await,
        Commands::Fingerprint(args) => commands::fingerprint::execute(args).await,
        Commands::Kb(args) => commands::kb::execute(args, config).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(categorize_error(&e))
        }
    }
}

/// Install the tracing subscriber.
///
/// `RUST_LOG` wins over the flags; `SITEFAB_LOG_FORMAT=json` switches to
/// JSON lines. Logs go to stderr so reports on stdout stay machine readable.
fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,sitefab={}", level)));

    let json = std::env::var("SITEFAB_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };

    if result.is_err() {
        // Logging already initialized, continue
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(failure) = cause.downcast_ref::<Failure>() {
            return match failure {
                Failure::InvalidChecklist(_) => ExitCodes::INVALID_ARGS,
                Failure::GenerationFailed(_) => ExitCodes::GENERATION_FAILED,
            };
        }
        if cause.is::<SpecError>() {
            return ExitCodes::INVALID_ARGS;
        }
        if let Some(CoreError::Config(_) | CoreError::InvalidChecklist(_)) =
            cause.downcast_ref::<CoreError>()
        {
            return ExitCodes::INVALID_ARGS;
        }
    }
    ExitCodes::GENERAL_ERROR
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_generation_failure_exit_code() {
        let e = anyhow::Error::from(Failure::GenerationFailed("cancelled".to_string()));
        assert_eq!(categorize_error(&e), ExitCodes::GENERATION_FAILED);
    }

    #[test]
    fn test_checklist_errors_exit_code() {
        let e = anyhow::Error::from(Failure::InvalidChecklist(2));
        assert_eq!(categorize_error(&e), ExitCodes::INVALID_ARGS);

        let e = Err::<(), _>(SpecError::NotFound("site.json".into()))
            .context("Failed to read checklist")
            .unwrap_err();
        assert_eq!(categorize_error(&e), ExitCodes::INVALID_ARGS);
    }

    #[test]
    fn test_config_error_exit_code() {
        let e = Err::<(), _>(CoreError::Config("max_trials_final must be at least 1".to_string()))
            .context("Failed to load configuration")
            .unwrap_err();
        assert_eq!(categorize_error(&e), ExitCodes::INVALID_ARGS);
    }

    #[test]
    fn test_other_errors_exit_code() {
        let e = anyhow::anyhow!("connection reset");
        assert_eq!(categorize_error(&e), ExitCodes::GENERAL_ERROR);
    }
}
