//! Configuration module for Bloodhound-RS
//!
//! Handles loading settings from YAML files and environment variables.

mod settings;

pub use settings::*;

use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

/// Load settings from the first file found, or use defaults
///
/// `BLOODHOUND_SETTINGS_PATH` wins over the default locations. Environment
/// overrides are applied in every case.
pub fn load() -> Result<Settings> {
    let mut settings = match find_settings_file() {
        Some(path) => {
            info!("Loading settings from: {}", path.display());
            Settings::from_file(&path)?
        }
        None => {
            info!("No settings file found, using defaults");
            Settings::default()
        }
    };

    settings.merge_env();
    Ok(settings)
}

fn find_settings_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("BLOODHOUND_SETTINGS_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let mut paths = vec![
        PathBuf::from("bloodhound.yml"),
        PathBuf::from("config/bloodhound.yml"),
    ];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("bloodhound-rs/bloodhound.yml"));
    }

    paths.into_iter().find(|p| p.exists())
}
