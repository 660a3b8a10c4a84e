//! CLI command definitions.
//!
//! Each subcommand maps to one entry point of the factory: generating a
//! site, checking a checklist, or inspecting the knowledge base.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod check;
pub mod fingerprint;
pub mod generate;
pub mod kb;

/// siteFab - AI website factory with self-healing validation
#[derive(Parser)]
#[command(name = "sitefab")]
#[command(version, about = "siteFab - AI website factory with self-healing validation")]
#[command(long_about = r#"
siteFab turns a website checklist into a generated Next.js project. Agents plan,
design, write and test every component; failing validations go through a
recovery loop that diagnoses the root cause and rewrites the offending file.

COMMANDS:
  generate      → Generate a website from a checklist
  check         → Validate a checklist and print its summary
  fingerprint   → Print the signature of an error log
  kb            → Inspect the knowledge base of verified fixes

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments or checklist
  3 - Generation failed
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file (defaults to ./sitefab.toml when present)
    #[arg(long, global = true, env = "SITEFAB_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a website from a checklist
    Generate(generate::GenerateArgs),

    /// Validate a checklist file
    Check(check::CheckArgs),

    /// Fingerprint an error log
    Fingerprint(fingerprint::FingerprintArgs),

    /// Knowledge base commands
    Kb(kb::KbArgs),
}

/// Command outcomes that map to dedicated exit codes.
#[derive(Debug, thiserror::Error)]
pub enum Failure {
    #[error("Checklist has {0} error(s)")]
    InvalidChecklist(usize),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generate() {
        let cli = Cli::try_parse_from([
            "sitefab",
            "--verbose",
            "generate",
            "--checklist",
            "site.json",
            "--output",
            "out",
        ])
        .unwrap();
        assert!(cli.verbose);
        let Commands::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.checklist, PathBuf::from("site.json"));
        assert_eq!(args.output, Some(PathBuf::from("out")));
        assert!(!args.no_kb);
    }

    #[test]
    fn test_parse_kb_search() {
        let cli = Cli::try_parse_from(["sitefab", "kb", "search", "build.log", "-k", "5"]).unwrap();
        let Commands::Kb(kb::KbArgs {
            command: kb::KbCommand::Search { log, k, .. },
        }) = cli.command
        else {
            panic!("expected kb search");
        };
        assert_eq!(log, PathBuf::from("build.log"));
        assert_eq!(k, 5);
    }

    #[test]
    fn test_generate_requires_checklist() {
        assert!(Cli::try_parse_from(["sitefab", "generate"]).is_err());
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["sitefab", "-v", "-q", "check", "site.json"]).is_err());
    }
}
