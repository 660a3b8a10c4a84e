//! Fingerprint command - Print the signature of an error log.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;

use sitefab_kb::Fingerprint;

#[derive(Args)]
pub struct FingerprintArgs {
    /// File containing the error log
    log: PathBuf,

    /// Print as JSON
    #[arg(long)]
    json: bool,
}

pub async fn execute(args: FingerprintArgs) -> Result<()> {
    let log = std::fs::read_to_string(&args.log)
        .with_context(|| format!("Failed to read log {:?}", args.log))?;

    let signature = Fingerprint::compute(&log);
    let summary = Fingerprint::summary(&log);

    if args.json {
        let output = json!({
            "signature": signature,
            "category": signature.category(),
            "summary": summary,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", signature);
        if let Some(summary) = summary {
            println!("   {}", summary);
        }
    }
    Ok(())
}
