//! Model selection and loading.
//!
//! Each selectable model maps to one artifact file and one loader; every loader produces the
//! same [`ModelHandle`] so adapters never care which backend they are talking to.

use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Result;
use log::info;
use tract_onnx::prelude::DatumType;

use crate::{
    classical::{DenseNetwork, LinearModel},
    error::HubError,
    model::{ModelHandle, Predictor},
    onnx::{InputPin, OnnxModel},
    preprocess::TUMOR_INPUT_SIZE,
    sequence::SEQUENCE_LEN,
};
use hub_utils::timing_guard;

type Loader = fn(&Path) -> Result<Box<dyn Predictor>>;

/// The selectable sentiment classifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SentimentModel {
    Perceptron,
    BackPropagation,
    Dnn,
    Rnn,
    #[default]
    Lstm,
}

impl SentimentModel {
    pub const ALL: [SentimentModel; 5] = [
        SentimentModel::Perceptron,
        SentimentModel::BackPropagation,
        SentimentModel::Dnn,
        SentimentModel::Rnn,
        SentimentModel::Lstm,
    ];

    /// Human-readable name as shown in selection lists.
    pub fn display_name(self) -> &'static str {
        match self {
            SentimentModel::Perceptron => "Perceptron",
            SentimentModel::BackPropagation => "Back Propagation",
            SentimentModel::Dnn => "DNN",
            SentimentModel::Rnn => "RNN",
            SentimentModel::Lstm => "LSTM",
        }
    }

    /// File name of the serialized model inside the model directory.
    pub fn artifact_name(self) -> &'static str {
        match self {
            SentimentModel::Perceptron => "imdb_perceptron.json",
            SentimentModel::BackPropagation => "imdb_back_prop.json",
            SentimentModel::Dnn => "DNN.onnx",
            SentimentModel::Rnn => "RNN.onnx",
            SentimentModel::Lstm => "LSTM.onnx",
        }
    }

    pub fn artifact_path(self, model_dir: impl AsRef<Path>) -> PathBuf {
        model_dir.as_ref().join(self.artifact_name())
    }

    fn loader(self) -> Loader {
        match self {
            SentimentModel::Perceptron => load_linear,
            SentimentModel::BackPropagation => load_dense,
            SentimentModel::Dnn | SentimentModel::Rnn | SentimentModel::Lstm => load_onnx_sequence,
        }
    }

    /// Load this model's artifact from `model_dir`.
    pub fn load(self, model_dir: impl AsRef<Path>) -> Result<ModelHandle, HubError> {
        let path = self.artifact_path(model_dir);
        load_with(self.display_name(), &path, self.loader())
    }
}

impl fmt::Display for SentimentModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SentimentModel::Perceptron => "perceptron",
            SentimentModel::BackPropagation => "back-propagation",
            SentimentModel::Dnn => "dnn",
            SentimentModel::Rnn => "rnn",
            SentimentModel::Lstm => "lstm",
        })
    }
}

impl FromStr for SentimentModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "perceptron" => Ok(SentimentModel::Perceptron),
            "backpropagation" | "backprop" => Ok(SentimentModel::BackPropagation),
            "dnn" => Ok(SentimentModel::Dnn),
            "rnn" => Ok(SentimentModel::Rnn),
            "lstm" => Ok(SentimentModel::Lstm),
            _ => Err(format!(
                "unknown sentiment model '{}'; expected one of: perceptron, back-propagation, dnn, rnn, lstm",
                s.trim()
            )),
        }
    }
}

/// Name given to the tumor detection handle.
pub const TUMOR_MODEL_NAME: &str = "CNN";

/// Channels of the scans the CNN was trained on.
pub const TUMOR_INPUT_CHANNELS: usize = 3;

/// Load the convolutional tumor detector from an ONNX file.
///
/// Input 0 is pinned to `f32 [1, 128, 128, 3]`; scans with another channel count fail at
/// predict time with a model inference error.
pub fn load_tumor_model(path: impl AsRef<Path>) -> Result<ModelHandle, HubError> {
    load_with(TUMOR_MODEL_NAME, path.as_ref(), load_onnx_tumor)
}

/// Input fact for the ONNX sequence classifiers: one padded review.
pub fn sequence_input_pin() -> InputPin {
    InputPin::shape(vec![1, SEQUENCE_LEN])
}

pub fn tumor_input_pin() -> InputPin {
    InputPin::shape(vec![
        1,
        TUMOR_INPUT_SIZE.height as usize,
        TUMOR_INPUT_SIZE.width as usize,
        TUMOR_INPUT_CHANNELS,
    ])
    .with_datum_type(DatumType::F32)
}

fn load_linear(path: &Path) -> Result<Box<dyn Predictor>> {
    Ok(Box::new(LinearModel::load(path)?))
}

fn load_dense(path: &Path) -> Result<Box<dyn Predictor>> {
    Ok(Box::new(DenseNetwork::load(path)?))
}

fn load_onnx_sequence(path: &Path) -> Result<Box<dyn Predictor>> {
    Ok(Box::new(OnnxModel::load_pinned(path, &sequence_input_pin())?))
}

fn load_onnx_tumor(path: &Path) -> Result<Box<dyn Predictor>> {
    Ok(Box::new(OnnxModel::load_pinned(path, &tumor_input_pin())?))
}

fn load_with(name: &str, path: &Path, loader: Loader) -> Result<ModelHandle, HubError> {
    let _guard = timing_guard(format!("hub_core::load_model[{name}]"), log::Level::Debug);
    let predictor = loader(path).map_err(HubError::load)?;
    info!("Loaded {name} model from {}", path.display());
    Ok(ModelHandle::from_boxed(name, predictor))
}
