//! Import command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::library::{Library, VideoImport};
use anyhow::{Context, Result};

/// Run the import command.
pub async fn run_import(file: &str, embed: bool, settings: Settings) -> Result<()> {
    let path = Settings::expand_path(file);
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let items: Vec<VideoImport> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    if items.is_empty() {
        Output::warning("Import file contains no videos.");
        return Ok(());
    }

    let library = Library::open(&settings).await?;

    let spinner = Output::spinner(&format!(
        "Importing {} videos{}...",
        items.len(),
        if embed { " with embeddings" } else { "" }
    ));
    let result = library.import(items, embed).await;
    spinner.finish_and_clear();

    let summary = result?;
    Output::success(&format!("Imported {} videos", summary.imported));
    if embed {
        Output::kv("Embedded", &summary.embedded.to_string());
    }
    for skipped in &summary.skipped {
        Output::warning(&format!("Skipped unrecognised video reference: {}", skipped));
    }

    Ok(())
}
