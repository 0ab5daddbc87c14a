//! Command-line argument definitions for hub-cli.

use clap::{ArgAction, Args, Parser, Subcommand};
use hub_core::SentimentModel;
use hub_utils::config::ResizeQuality;
use std::path::PathBuf;

/// Classify review sentiment or detect tumors in scan images.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct HubArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Optional settings JSON. Defaults to `config/hub_settings.json` when present, otherwise built-in parameters.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Write the prediction to a JSON file instead of stdout.
    #[arg(long, global = true)]
    pub json: Option<PathBuf>,

    /// Give up on a prediction after this many milliseconds (0 disables the deadline).
    #[arg(long, global = true, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Enable telemetry timing logs (defaults to settings file).
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    pub telemetry: bool,

    /// Override telemetry logging level (error, warn, info, debug, trace).
    #[arg(long, global = true, value_name = "LEVEL")]
    pub telemetry_level: Option<String>,

    /// Resize quality mode: `quality` (bicubic) or `speed` (nearest).
    #[arg(long, global = true, value_name = "MODE")]
    pub resize_quality: Option<ResizeQuality>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Classify a movie review as Positive or Negative.
    Sentiment(SentimentArgs),
    /// Report whether a scan image shows a tumor.
    Tumor(TumorArgs),
}

#[derive(Debug, Args)]
pub struct SentimentArgs {
    /// Review text to classify.
    #[arg(short, long)]
    pub text: String,

    /// Sentiment model: perceptron, back-propagation, dnn, rnn or lstm.
    #[arg(short, long, value_name = "MODEL")]
    pub model: Option<SentimentModel>,

    /// Directory holding the sentiment model artifacts.
    #[arg(long)]
    pub model_dir: Option<PathBuf>,

    /// Word-index JSON used to tokenize the review.
    #[arg(long)]
    pub vocabulary: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct TumorArgs {
    /// Scan image to inspect.
    #[arg(short, long)]
    pub image: PathBuf,

    /// Path to the tumor ONNX model.
    #[arg(short, long)]
    pub model: Option<PathBuf>,

    /// Download the model from this URL (cached after the first fetch).
    #[arg(long, value_name = "URL")]
    pub model_url: Option<String>,

    /// Directory for downloaded models.
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,
}
