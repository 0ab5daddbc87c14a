//! Settings shared by the prediction hub front ends.
//!
//! Everything here serializes to a single JSON document. Every section carries
//! `#[serde(default)]` so partial files only override what they mention.

use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use anyhow::{Context, Result};
use image::imageops::FilterType;
use log::LevelFilter;
use serde::{Deserialize, Serialize};

/// Resize filter preference for image preprocessing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResizeQuality {
    /// Bicubic resampling (default).
    #[default]
    Quality,
    /// Nearest-neighbour resampling.
    Speed,
}

impl ResizeQuality {
    /// The `image` filter implementing this preference.
    pub fn filter(self) -> FilterType {
        match self {
            ResizeQuality::Quality => FilterType::CatmullRom,
            ResizeQuality::Speed => FilterType::Nearest,
        }
    }
}

impl fmt::Display for ResizeQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResizeQuality::Quality => "quality",
            ResizeQuality::Speed => "speed",
        })
    }
}

impl FromStr for ResizeQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quality" => Ok(ResizeQuality::Quality),
            "speed" => Ok(ResizeQuality::Speed),
            other => Err(format!(
                "invalid resize quality '{other}'; expected 'quality' or 'speed'"
            )),
        }
    }
}

/// Where the sentiment models live and which one is used by default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SentimentSettings {
    /// Directory containing the sentiment model artifacts.
    pub model_dir: String,
    /// Model selected when the caller does not pick one (e.g. "lstm").
    pub default_model: String,
}

impl Default for SentimentSettings {
    fn default() -> Self {
        Self {
            model_dir: "models".to_string(),
            default_model: "lstm".to_string(),
        }
    }
}

/// Location of the tumor detection model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TumorSettings {
    /// Local path to the ONNX model.
    pub model_path: String,
    /// Remote location to fetch the model from when `model_path` is missing.
    pub model_url: Option<String>,
    /// Directory for fetched artifacts.
    pub cache_dir: String,
}

impl Default for TumorSettings {
    fn default() -> Self {
        Self {
            model_path: "models/CNN.onnx".to_string(),
            model_url: None,
            cache_dir: ".cache/models".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct ImageInputSettings {
    pub resize_quality: ResizeQuality,
}

/// Predict-call limits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct InferenceSettings {
    /// Abort waiting on a prediction after this many milliseconds. `None` waits forever.
    pub timeout_ms: Option<u64>,
}

impl InferenceSettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.filter(|ms| *ms > 0).map(Duration::from_millis)
    }
}

/// Settings controlling optional runtime telemetry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TelemetrySettings {
    /// Whether timing logs are emitted.
    pub enabled: bool,
    /// Logging level for telemetry output (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            level: "debug".to_string(),
        }
    }
}

impl TelemetrySettings {
    /// Resolve the configured level string, falling back to `Debug` for unknown values.
    pub fn level_filter(&self) -> LevelFilter {
        LevelFilter::from_str(self.level.trim()).unwrap_or(LevelFilter::Debug)
    }
}

/// Persistent application settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppSettings {
    /// Word-index JSON used to tokenize reviews.
    pub vocabulary_path: Option<String>,
    pub sentiment: SentimentSettings,
    pub tumor: TumorSettings,
    pub input: ImageInputSettings,
    pub inference: InferenceSettings,
    pub telemetry: TelemetrySettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            vocabulary_path: Some(DEFAULT_VOCABULARY_PATH.to_string()),
            sentiment: SentimentSettings::default(),
            tumor: TumorSettings::default(),
            input: ImageInputSettings::default(),
            inference: InferenceSettings::default(),
            telemetry: TelemetrySettings::default(),
        }
    }
}

const DEFAULT_VOCABULARY_PATH: &str = "models/imdb_word_index.json";

impl AppSettings {
    /// Load settings from a JSON file.
    ///
    /// A missing `vocabulary_path` falls back to the default location.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        let mut settings: AppSettings = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse settings JSON at {}", path.display()))?;

        if settings.vocabulary_path.is_none() {
            settings.vocabulary_path = Some(DEFAULT_VOCABULARY_PATH.to_string());
        }
        Ok(settings)
    }

    /// Write settings as pretty-printed JSON, replacing any existing file.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let payload =
            serde_json::to_string_pretty(self).context("failed to serialize settings JSON")?;
        fs::write(path, payload)
            .with_context(|| format!("failed to write settings file {}", path.display()))
    }

    pub fn vocabulary_path(&self) -> PathBuf {
        PathBuf::from(
            self.vocabulary_path
                .as_deref()
                .unwrap_or(DEFAULT_VOCABULARY_PATH),
        )
    }
}

/// Default location of persisted settings (`config/hub_settings.json`).
pub fn default_settings_path() -> PathBuf {
    env::current_dir()
        .map(|dir| dir.join("config/hub_settings.json"))
        .unwrap_or_else(|_| PathBuf::from("config/hub_settings.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn default_settings_round_trip() {
        let file = NamedTempFile::new().expect("tempfile");
        let settings = AppSettings::default();
        settings.save_to_path(file.path()).expect("save");

        let loaded = AppSettings::load_from_path(file.path()).expect("load");
        assert_eq!(loaded, settings);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let file = NamedTempFile::new().expect("tempfile");
        let json = r#"{
            "vocabulary_path": null,
            "tumor": { "model_url": "https://example.com/cnn.onnx" },
            "inference": { "timeout_ms": 2500 }
        }"#;
        fs::write(file.path(), json).expect("write custom settings");

        let loaded = AppSettings::load_from_path(file.path()).expect("load");
        assert_eq!(
            loaded.vocabulary_path(),
            PathBuf::from(DEFAULT_VOCABULARY_PATH)
        );
        assert_eq!(loaded.tumor.model_path, "models/CNN.onnx");
        assert_eq!(
            loaded.tumor.model_url.as_deref(),
            Some("https://example.com/cnn.onnx")
        );
        assert_eq!(loaded.inference.timeout(), Some(Duration::from_millis(2500)));
        assert_eq!(loaded.sentiment, SentimentSettings::default());
        assert_eq!(loaded.input.resize_quality, ResizeQuality::Quality);
    }

    #[test]
    fn zero_timeout_means_no_deadline() {
        let settings = InferenceSettings {
            timeout_ms: Some(0),
        };
        assert_eq!(settings.timeout(), None);
    }

    #[test]
    fn telemetry_level_parses_variants() {
        let telemetry = TelemetrySettings {
            level: "TRACE".into(),
            ..TelemetrySettings::default()
        };
        assert_eq!(telemetry.level_filter(), LevelFilter::Trace);

        let telemetry = TelemetrySettings {
            level: "bogus".into(),
            ..TelemetrySettings::default()
        };
        assert_eq!(telemetry.level_filter(), LevelFilter::Debug);
    }

    #[test]
    fn resize_quality_parses_and_maps_filters() {
        assert_eq!("Speed".parse::<ResizeQuality>(), Ok(ResizeQuality::Speed));
        assert!("blurry".parse::<ResizeQuality>().is_err());
        assert_eq!(ResizeQuality::Quality.filter(), FilterType::CatmullRom);
        assert_eq!(ResizeQuality::Speed.to_string(), "speed");
    }
}
