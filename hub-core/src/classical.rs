//! Classical classifiers stored as JSON weight files.
//!
//! These cover the perceptron and back-propagation selections, which operate directly on
//! the padded token indices as a feature vector.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use ndarray::{Array1, Array2, ArrayD, Axis};
use serde::Deserialize;

use crate::model::{ModelInput, Predictor};

/// Single-layer perceptron.
///
/// Predicts the class label (`1.0` or `0.0`) of each batch row, like a fitted
/// scikit-learn `Perceptron.predict`.
#[derive(Debug, Clone)]
pub struct LinearModel {
    weights: Array1<f32>,
    bias: f32,
}

#[derive(Debug, Deserialize)]
struct LinearModelFile {
    weights: Vec<f32>,
    #[serde(default)]
    bias: f32,
}

impl LinearModel {
    pub fn new(weights: Vec<f32>, bias: f32) -> Result<Self> {
        anyhow::ensure!(!weights.is_empty(), "perceptron has no weights");
        anyhow::ensure!(
            weights.iter().all(|w| w.is_finite()) && bias.is_finite(),
            "perceptron weights must be finite"
        );
        Ok(Self {
            weights: Array1::from(weights),
            bias,
        })
    }

    /// Load `{ "weights": [...], "bias": b }`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file: LinearModelFile = read_json(path.as_ref())?;
        Self::new(file.weights, file.bias)
            .with_context(|| format!("invalid perceptron in {}", path.as_ref().display()))
    }

    pub fn feature_count(&self) -> usize {
        self.weights.len()
    }

    /// Raw `w·x + b` for every batch row.
    pub fn decision_function(&self, features: &Array2<f32>) -> Result<Array1<f32>> {
        anyhow::ensure!(
            features.ncols() == self.feature_count(),
            "perceptron expects {} features, got {}",
            self.feature_count(),
            features.ncols()
        );
        Ok(features.dot(&self.weights) + self.bias)
    }
}

impl Predictor for LinearModel {
    fn predict(&self, input: &ModelInput) -> Result<ArrayD<f32>> {
        let features = input.to_feature_matrix()?;
        let labels = self
            .decision_function(&features)?
            .mapv(|margin| if margin > 0.0 { 1.0 } else { 0.0 });
        Ok(labels.into_dyn())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Identity,
    Relu,
    Sigmoid,
    Tanh,
}

impl Activation {
    fn apply(self, value: f32) -> f32 {
        match self {
            Activation::Identity => value,
            Activation::Relu => value.max(0.0),
            Activation::Sigmoid => 1.0 / (1.0 + (-value).exp()),
            Activation::Tanh => value.tanh(),
        }
    }
}

#[derive(Debug, Clone)]
struct DenseLayer {
    /// Shape `[outputs, inputs]`.
    weights: Array2<f32>,
    bias: Array1<f32>,
    activation: Activation,
}

#[derive(Debug, Deserialize)]
struct DenseLayerFile {
    weights: Vec<Vec<f32>>,
    bias: Vec<f32>,
    #[serde(default)]
    activation: Activation,
}

#[derive(Debug, Deserialize)]
struct DenseNetworkFile {
    layers: Vec<DenseLayerFile>,
}

/// Fully connected network trained with back-propagation.
///
/// Returns the final layer's activations, shape `[batch, outputs]`.
#[derive(Debug, Clone)]
pub struct DenseNetwork {
    layers: Vec<DenseLayer>,
}

impl DenseNetwork {
    /// Load `{ "layers": [{ "weights": [[..]], "bias": [..], "activation": "relu" }, ...] }`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file: DenseNetworkFile = read_json(path)?;
        Self::from_file(file).with_context(|| format!("invalid network in {}", path.display()))
    }

    fn from_file(file: DenseNetworkFile) -> Result<Self> {
        anyhow::ensure!(!file.layers.is_empty(), "network has no layers");

        let mut layers = Vec::with_capacity(file.layers.len());
        let mut expected_inputs: Option<usize> = None;
        for (idx, layer) in file.layers.into_iter().enumerate() {
            let outputs = layer.weights.len();
            let inputs = layer.weights.first().map_or(0, Vec::len);
            anyhow::ensure!(
                outputs > 0 && inputs > 0,
                "layer {idx} has an empty weight matrix"
            );
            anyhow::ensure!(
                layer.weights.iter().all(|row| row.len() == inputs),
                "layer {idx} has ragged weight rows"
            );
            anyhow::ensure!(
                layer.bias.len() == outputs,
                "layer {idx} bias has {} entries for {} outputs",
                layer.bias.len(),
                outputs
            );
            if let Some(expected) = expected_inputs {
                anyhow::ensure!(
                    inputs == expected,
                    "layer {idx} takes {inputs} inputs but the previous layer produces {expected}"
                );
            }
            expected_inputs = Some(outputs);

            let flat: Vec<f32> = layer.weights.into_iter().flatten().collect();
            layers.push(DenseLayer {
                weights: Array2::from_shape_vec((outputs, inputs), flat)?,
                bias: Array1::from(layer.bias),
                activation: layer.activation,
            });
        }
        Ok(Self { layers })
    }

    pub fn input_width(&self) -> usize {
        self.layers.first().map_or(0, |layer| layer.weights.ncols())
    }

    pub fn forward(&self, features: &Array2<f32>) -> Result<Array2<f32>> {
        anyhow::ensure!(
            features.ncols() == self.input_width(),
            "network expects {} features, got {}",
            self.input_width(),
            features.ncols()
        );
        let mut activations = features.clone();
        for layer in &self.layers {
            let mut next = activations.dot(&layer.weights.t());
            next += &layer.bias.view().insert_axis(Axis(0));
            next.mapv_inplace(|v| layer.activation.apply(v));
            activations = next;
        }
        Ok(activations)
    }
}

impl Predictor for DenseNetwork {
    fn predict(&self, input: &ModelInput) -> Result<ArrayD<f32>> {
        let features = input.to_feature_matrix()?;
        Ok(self.forward(&features)?.into_dyn())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    anyhow::ensure!(path.exists(), "model file not found: {}", path.display());
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read model file {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse model JSON at {}", path.display()))
}
