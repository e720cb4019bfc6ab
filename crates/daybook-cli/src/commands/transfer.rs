use std::fs;
use std::path::Path;

use daybook_core::ExportDocument;

use crate::commands::load_journal;
use crate::Cli;

pub fn handle_export(cli: &Cli, file: &str) -> anyhow::Result<()> {
    let journal = load_journal(cli)?;
    let document = journal.export()?;

    let contents = serde_json::to_string_pretty(&document)?;
    fs::write(Path::new(file), contents)
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", file, e))?;

    if !cli.quiet {
        println!(
            "Exported {} entries, {} moods, {} activities to {}",
            document.entries.len(),
            document.moods.len(),
            document.activities.len(),
            file
        );
    }
    Ok(())
}

pub fn handle_import(cli: &Cli, file: &str) -> anyhow::Result<()> {
    let contents = fs::read_to_string(Path::new(file))
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", file, e))?;
    let document: ExportDocument = serde_json::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("{} is not a valid export document: {}", file, e))?;

    let mut journal = load_journal(cli)?;
    let report = journal.import_document(document, "import")?;

    if !cli.quiet {
        println!(
            "Imported {} entries, {} moods, {} activities",
            report.entries_imported, report.moods_imported, report.activities_imported
        );
    }
    // Rejects are reported per record, never silently dropped.
    for rejected in &report.rejected {
        eprintln!(
            "Rejected {} record #{}: {}",
            rejected.collection, rejected.index, rejected.reason
        );
    }
    if !report.rejected.is_empty() {
        anyhow::bail!("{} records were rejected", report.rejected.len());
    }
    Ok(())
}
