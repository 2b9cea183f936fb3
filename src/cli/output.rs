//! CLI output formatting utilities.

use crate::search::{Provenance, ResultRecord};
use crate::store::IndexedVideo;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a summary line for an indexed video.
    pub fn video_info(video: &IndexedVideo) {
        println!(
            "  {} {} ({}, {}, {} words{})",
            style("*").cyan(),
            style(&video.title).bold(),
            style(&video.video_id).dim(),
            video.publish_date,
            video.word_count,
            if video.has_embedding { ", embedded" } else { "" }
        );
    }

    /// Print a search result.
    pub fn search_result(result: &ResultRecord) {
        let provenance = match result.provenance {
            Provenance::Exact => style("exact").green(),
            Provenance::Hybrid => style("hybrid").magenta(),
            Provenance::Widened => style("widened").yellow(),
        };

        println!(
            "\n{} {} [{}] (score: {:.2})",
            style(">>").green(),
            style(&result.title).bold(),
            provenance,
            result.score
        );
        println!(
            "   {} | {}",
            style(&result.channel).cyan(),
            style(&result.publish_date).dim()
        );
        println!(
            "   {}",
            style(format!("https://www.youtube.com/watch?v={}", result.id)).dim()
        );
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}
