//! Check command - Validate a checklist file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use sitefab_spec::{ChecklistReader, ChecklistValidator};

use super::Failure;

#[derive(Args)]
pub struct CheckArgs {
    /// Checklist file (JSON or YAML)
    checklist: PathBuf,
}

pub async fn execute(args: CheckArgs) -> Result<()> {
    info!("Checking checklist: {:?}", args.checklist);

    let checklist = ChecklistReader::read(&args.checklist)
        .with_context(|| format!("Failed to read checklist {:?}", args.checklist))?;
    let result = ChecklistValidator::validate(&checklist);

    println!("📋 {}", args.checklist.display());
    println!("   Pages: {}", checklist.pages.len());
    for page in &checklist.pages {
        println!("     {} ({}) - {} section(s)", page.name, page.path, page.sections.len());
    }
    println!("   Sections: {}", checklist.section_count());
    println!("   Components: {}", checklist.component_types().join(", "));
    for (name, value) in &checklist.branding.colors {
        println!("   Colour {}: {}", name, value);
    }

    for warning in &result.warnings {
        println!("   ⚠️  {}", warning);
    }

    if !result.valid {
        println!("   ❌ Checklist is invalid:");
        for error in &result.errors {
            println!("      - {}", error);
        }
        return Err(Failure::InvalidChecklist(result.errors.len()).into());
    }

    println!("   ✅ Checklist is valid");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_checklist(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("site.json");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[tokio::test]
    async fn test_valid_checklist_passes() {
        let temp = TempDir::new().unwrap();
        let checklist = write_checklist(
            &temp,
            r##"{"branding": {"colors": {"primary": "#10B981"}},
                "pages": [{"name": "Home", "path": "/", "sections": [{"component": "Hero"}]}]}"##,
        );

        execute(CheckArgs { checklist }).await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_checklist_reports_error_count() {
        let temp = TempDir::new().unwrap();
        let checklist = write_checklist(
            &temp,
            r##"{"branding": {"colors": {"primary": "green"}},
                "pages": [{"name": "Home", "path": "home", "sections": []}]}"##,
        );

        let err = execute(CheckArgs { checklist }).await.unwrap_err();
        match err.downcast_ref::<Failure>() {
            Some(Failure::InvalidChecklist(count)) => assert_eq!(*count, 2),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
