//! List command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::library::Library;
use anyhow::Result;

/// Run the list command.
pub async fn run_list(settings: Settings) -> Result<()> {
    let library = Library::open(&settings).await?;

    match library.list().await {
        Ok(videos) => {
            if videos.is_empty() {
                Output::info("No videos indexed yet. Use 'finn import <file.json>' to add content.");
            } else {
                Output::header(&format!("Indexed Videos ({})", videos.len()));
                println!();

                for video in &videos {
                    Output::video_info(video);
                }

                let embedded = videos.iter().filter(|v| v.has_embedding).count();
                let words: usize = videos.iter().map(|v| v.word_count).sum();
                println!();
                Output::kv("Total videos", &videos.len().to_string());
                Output::kv("Embedded", &embedded.to_string());
                Output::kv("Total words", &words.to_string());
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to list videos: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
