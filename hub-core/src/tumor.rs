//! Scan image in, tumor label out.

use std::{fmt, path::Path};

use image::DynamicImage;
use log::debug;
use ndarray::ArrayD;

use crate::{
    error::HubError,
    model::ModelHandle,
    preprocess::{
        PreprocessConfig, PreprocessOutput, preprocess_dynamic_image, preprocess_image,
        preprocess_image_bytes,
    },
};
use hub_utils::timing_guard;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TumorLabel {
    Detected,
    NotDetected,
}

impl TumorLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            TumorLabel::Detected => "Tumor Detected",
            TumorLabel::NotDetected => "No Tumor",
        }
    }

    /// Truthiness rule: any nonzero value means a tumor; empty output means none.
    ///
    /// No probability threshold applies, so an output of `0.1` counts as detected.
    pub fn from_output(output: &ArrayD<f32>) -> Self {
        if output.iter().any(|&v| v != 0.0) {
            TumorLabel::Detected
        } else {
            TumorLabel::NotDetected
        }
    }
}

impl fmt::Display for TumorLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detect a tumor in an encoded image (PNG, JPEG, ...) with the default 128x128 preprocessing.
pub fn detect_tumor(image_bytes: &[u8], model: &ModelHandle) -> Result<TumorLabel, HubError> {
    detect_tumor_with(image_bytes, model, &PreprocessConfig::default())
}

pub fn detect_tumor_with(
    image_bytes: &[u8],
    model: &ModelHandle,
    config: &PreprocessConfig,
) -> Result<TumorLabel, HubError> {
    let prep = preprocess_image_bytes(image_bytes, config)?;
    run_preprocessed(prep, model)
}

/// Detect a tumor in an image that is already decoded.
pub fn detect_tumor_image(
    image: &DynamicImage,
    model: &ModelHandle,
    config: &PreprocessConfig,
) -> Result<TumorLabel, HubError> {
    let prep = preprocess_dynamic_image(image, config)
        .map_err(|e| HubError::ImageDecode(format!("{e:#}")))?;
    run_preprocessed(prep, model)
}

fn run_preprocessed(prep: PreprocessOutput, model: &ModelHandle) -> Result<TumorLabel, HubError> {
    let original_size = prep.original_size;
    let output = {
        let _guard = timing_guard("hub_core::tumor_inference", log::Level::Debug);
        model.predict(prep.into_model_input())?
    };
    let label = TumorLabel::from_output(&output);
    debug!(
        "'{}' on {}x{} image -> {label} (output shape {:?})",
        model.name(),
        original_size.0,
        original_size.1,
        output.shape()
    );
    Ok(label)
}

/// The tumor model paired with its preprocessing settings.
#[derive(Debug, Clone)]
pub struct TumorDetector {
    model: ModelHandle,
    preprocess: PreprocessConfig,
}

impl TumorDetector {
    pub fn new(model: ModelHandle, preprocess: PreprocessConfig) -> Self {
        Self { model, preprocess }
    }

    pub fn detect_bytes(&self, image_bytes: &[u8]) -> Result<TumorLabel, HubError> {
        detect_tumor_with(image_bytes, &self.model, &self.preprocess)
    }

    pub fn detect_path<P: AsRef<Path>>(&self, path: P) -> Result<TumorLabel, HubError> {
        let prep = preprocess_image(path, &self.preprocess)?;
        run_preprocessed(prep, &self.model)
    }

    pub fn detect_image(&self, image: &DynamicImage) -> Result<TumorLabel, HubError> {
        detect_tumor_image(image, &self.model, &self.preprocess)
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }
}
