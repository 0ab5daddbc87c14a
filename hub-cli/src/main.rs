mod args;
mod config;
mod fetch;

use std::{
    fs::{self, File},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::Parser;
use hub_core::{
    HubError, PreprocessConfig, SentimentClassifier, SentimentModel, TumorDetector, Vocabulary,
    load_tumor_model,
};
use hub_utils::{config::AppSettings, configure_telemetry, init_logging};
use log::info;
use serde::Serialize;

use crate::{
    args::{Command, HubArgs, SentimentArgs, TumorArgs},
    config::{apply_cli_overrides, load_settings},
    fetch::fetch_cached,
};

#[derive(Debug, Serialize)]
struct PredictionRecord {
    task: &'static str,
    model: String,
    label: String,
}

fn main() -> Result<()> {
    init_logging(log::LevelFilter::Info)?;
    let args = HubArgs::parse();

    let mut settings = load_settings(args.config.as_ref())?;
    apply_cli_overrides(&mut settings, &args);
    configure_telemetry(
        settings.telemetry.enabled,
        settings.telemetry.level_filter(),
    );

    let record = match &args.command {
        Command::Sentiment(cmd) => run_sentiment(cmd, &settings)?,
        Command::Tumor(cmd) => run_tumor(cmd, &settings)?,
    };

    if let Some(json_path) = args.json.as_ref() {
        if let Some(dir) = json_path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create directory {}", dir.display()))?;
        }
        let file = File::create(json_path)
            .with_context(|| format!("failed to create {}", json_path.display()))?;
        serde_json::to_writer_pretty(file, &record).with_context(|| {
            format!("failed to write prediction JSON to {}", json_path.display())
        })?;
        info!("Wrote prediction to {}", json_path.display());
    } else {
        let json =
            serde_json::to_string_pretty(&record).context("failed to serialize prediction")?;
        println!("{json}");
    }

    Ok(())
}

fn run_sentiment(cmd: &SentimentArgs, settings: &AppSettings) -> Result<PredictionRecord> {
    if cmd.text.trim().is_empty() {
        return Err(tagged(HubError::EmptyInput));
    }

    let selection: SentimentModel = settings
        .sentiment
        .default_model
        .parse()
        .map_err(anyhow::Error::msg)?;

    let vocabulary = Vocabulary::from_json_path(settings.vocabulary_path()).map_err(tagged)?;
    let model = selection
        .load(&settings.sentiment.model_dir)
        .map_err(tagged)?
        .with_deadline(settings.inference.timeout());

    let classifier = SentimentClassifier::new(vocabulary.into(), model);
    let label = classifier.classify(cmd.text.trim()).map_err(tagged)?;
    info!("{} -> {label}", selection.display_name());

    Ok(PredictionRecord {
        task: "sentiment",
        model: selection.display_name().to_string(),
        label: label.to_string(),
    })
}

fn run_tumor(cmd: &TumorArgs, settings: &AppSettings) -> Result<PredictionRecord> {
    let model_path = match settings.tumor.model_url.as_deref() {
        Some(url) => fetch_cached(url, &PathBuf::from(&settings.tumor.cache_dir))?,
        None => PathBuf::from(&settings.tumor.model_path),
    };

    let model = load_tumor_model(&model_path)
        .map_err(tagged)?
        .with_deadline(settings.inference.timeout());
    let detector = TumorDetector::new(model, PreprocessConfig::from(settings.input));

    let label = detector.detect_path(&cmd.image).map_err(tagged)?;
    info!("{} -> {label}", cmd.image.display());

    Ok(PredictionRecord {
        task: "tumor",
        model: detector.model().name().to_string(),
        label: label.to_string(),
    })
}

/// Lead the error report with the stable error kind.
fn tagged(err: HubError) -> anyhow::Error {
    let kind = err.kind();
    anyhow::Error::new(err).context(kind.as_str())
}
