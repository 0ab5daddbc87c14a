//! Configuration loading and CLI override logic.

use std::path::PathBuf;

use anyhow::{Context, Result};
use hub_utils::{
    config::{AppSettings, default_settings_path},
    normalize_path,
};
use log::info;

use crate::args::{Command, HubArgs};

/// Load application settings from a file or use defaults.
pub fn load_settings(config_path: Option<&PathBuf>) -> Result<AppSettings> {
    if let Some(path) = config_path {
        let resolved = normalize_path(path)?;
        let settings = AppSettings::load_from_path(&resolved)?;
        info!("Loaded settings from {}", resolved.display());
        Ok(settings)
    } else {
        let default_path = default_settings_path();
        if default_path.exists() {
            let settings = AppSettings::load_from_path(&default_path).with_context(|| {
                format!(
                    "failed to load default settings from {}",
                    default_path.display()
                )
            })?;
            info!("Loaded settings from {}", default_path.display());
            Ok(settings)
        } else {
            Ok(AppSettings::default())
        }
    }
}

/// Apply command-line arguments to override loaded or default settings.
pub fn apply_cli_overrides(settings: &mut AppSettings, args: &HubArgs) {
    if args.telemetry {
        settings.telemetry.enabled = true;
    }
    if let Some(level) = args.telemetry_level.as_ref() {
        let normalized = level.trim();
        if !normalized.is_empty() {
            let lower = normalized.to_ascii_lowercase();
            settings.telemetry.level = lower.clone();
            if lower == "off" {
                settings.telemetry.enabled = false;
            }
        }
    }

    if let Some(timeout_ms) = args.timeout_ms {
        settings.inference.timeout_ms = Some(timeout_ms);
    }
    if let Some(mode) = args.resize_quality {
        settings.input.resize_quality = mode;
    }

    match &args.command {
        Command::Sentiment(cmd) => {
            if let Some(model) = cmd.model {
                settings.sentiment.default_model = model.to_string();
            }
            if let Some(dir) = cmd.model_dir.as_ref() {
                settings.sentiment.model_dir = dir.display().to_string();
            }
            if let Some(path) = cmd.vocabulary.as_ref() {
                settings.vocabulary_path = Some(path.display().to_string());
            }
        }
        Command::Tumor(cmd) => {
            if let Some(path) = cmd.model.as_ref() {
                settings.tumor.model_path = path.display().to_string();
                // An explicit local model wins over a configured download.
                settings.tumor.model_url = None;
            }
            if let Some(url) = cmd.model_url.as_ref() {
                settings.tumor.model_url = Some(url.clone());
            }
            if let Some(dir) = cmd.cache_dir.as_ref() {
                settings.tumor.cache_dir = dir.display().to_string();
            }
        }
    }
}
