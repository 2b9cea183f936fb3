//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::Result;
use std::path::Path;

/// Run the config command against the config file at `config_path`.
pub fn run_config(action: &ConfigAction, mut settings: Settings, config_path: &Path) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&settings)
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Set { key, value } => {
            settings.set(key, value)?;
            settings.save_to(config_path)?;
            Output::success(&format!("Set {} = {}", key, value));
        }

        ConfigAction::Edit => {
            if !config_path.exists() {
                settings.save_to(config_path)?;
                Output::info(&format!("Wrote default config to {}", config_path.display()));
            }

            let editor = std::env::var("VISUAL")
                .or_else(|_| std::env::var("EDITOR"))
                .unwrap_or_else(|_| "vi".to_string());

            match std::process::Command::new(&editor).arg(config_path).status() {
                Ok(status) if status.success() => {
                    // The edited file must still load.
                    match Settings::load_from(Some(config_path)) {
                        Ok(_) => Output::success("Config updated."),
                        Err(e) => Output::warning(&format!("Config no longer parses: {}", e)),
                    }
                }
                Ok(status) => Output::warning(&format!("{} exited with {}", editor, status)),
                Err(e) => {
                    Output::error(&format!("Could not launch {}: {}", editor, e));
                    Output::kv("Config file", &config_path.display().to_string());
                }
            }
        }

        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
    }

    Ok(())
}
