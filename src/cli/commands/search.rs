//! Search command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::library::Library;
use crate::search::SearchQuery;
use anyhow::Result;

/// Arguments of the search command.
#[derive(Debug, Clone)]
pub struct SearchArgs {
    pub query: String,
    pub channels: Vec<String>,
    pub limit: Option<usize>,
    pub user: Option<String>,
    pub max_level: Option<usize>,
    pub json: bool,
}

/// Run the search command.
pub async fn run_search(args: SearchArgs, settings: Settings) -> Result<()> {
    let mut query = SearchQuery::from_parts(
        Some(args.query),
        args.channels,
        Some(args.limit.unwrap_or(settings.search.default_limit)),
        args.user,
    )?;
    if let Some(level) = args.max_level {
        query = query.with_max_level(level);
    }

    let library = Library::open(&settings).await?;

    let spinner = (!args.json).then(|| Output::spinner("Searching..."));
    let result = library.search(&query).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let envelope = match result {
        Ok(envelope) => envelope,
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&envelope)?);
        return Ok(());
    }

    if envelope.is_empty() {
        Output::warning(&envelope.explanation);
        return Ok(());
    }

    Output::success(&envelope.explanation);
    for result in &envelope.results {
        Output::search_result(result);
    }

    Ok(())
}
