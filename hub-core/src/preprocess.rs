//! Preprocessing utilities for preparing images for the tumor detector.
//!
//! Images are stretched to the model's input resolution (aspect ratio is not preserved) and
//! converted to a `[1, H, W, C]` array of raw `0..=255` samples.

use std::path::Path;

use anyhow::Result;
use image::{DynamicImage, GenericImageView};
use ndarray::Array4;

use crate::{error::HubError, model::ModelInput};
use hub_utils::{
    config::{ImageInputSettings, ResizeQuality},
    decode_image, load_image, resize_exact,
    telemetry::timing_guard,
    to_nhwc_array,
};

/// Desired input resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSize {
    pub width: u32,
    pub height: u32,
}

impl InputSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Resolution the tumor CNN was trained on.
pub const TUMOR_INPUT_SIZE: InputSize = InputSize::new(128, 128);

impl Default for InputSize {
    fn default() -> Self {
        TUMOR_INPUT_SIZE
    }
}

/// Configuration for preprocessing an image before inference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreprocessConfig {
    pub input_size: InputSize,
    /// Resize filter preference controlling the quality vs speed trade-off.
    pub resize_quality: ResizeQuality,
}

impl From<ImageInputSettings> for PreprocessConfig {
    fn from(settings: ImageInputSettings) -> Self {
        PreprocessConfig {
            input_size: TUMOR_INPUT_SIZE,
            resize_quality: settings.resize_quality,
        }
    }
}

/// Output of preprocessing: the batch tensor plus where it came from.
#[derive(Debug, Clone)]
pub struct PreprocessOutput {
    /// Shape `[1, height, width, channels]`.
    pub tensor: Array4<f32>,
    /// Dimensions of the decoded image before resizing.
    pub original_size: (u32, u32),
}

impl PreprocessOutput {
    pub fn channels(&self) -> usize {
        self.tensor.shape()[3]
    }

    pub fn into_model_input(self) -> ModelInput {
        ModelInput::Pixels(self.tensor)
    }
}

/// Preprocess an already decoded image.
pub fn preprocess_dynamic_image(
    image: &DynamicImage,
    config: &PreprocessConfig,
) -> Result<PreprocessOutput> {
    let _guard = timing_guard("hub_core::preprocess_image", log::Level::Trace);
    let InputSize { width, height } = config.input_size;
    anyhow::ensure!(
        width > 0 && height > 0,
        "input dimensions must be greater than zero"
    );

    let original_size = image.dimensions();
    anyhow::ensure!(
        original_size.0 > 0 && original_size.1 > 0,
        "source image dimensions must be greater than zero"
    );

    let resized = resize_exact(image, width, height, config.resize_quality.filter());
    Ok(PreprocessOutput {
        tensor: to_nhwc_array(&resized),
        original_size,
    })
}

/// Decode encoded image bytes and preprocess them.
pub fn preprocess_image_bytes(
    bytes: &[u8],
    config: &PreprocessConfig,
) -> Result<PreprocessOutput, HubError> {
    let image = decode_image(bytes).map_err(|e| HubError::ImageDecode(format!("{e:#}")))?;
    preprocess_dynamic_image(&image, config).map_err(|e| HubError::ImageDecode(format!("{e:#}")))
}

/// Read an image file and preprocess it.
pub fn preprocess_image<P: AsRef<Path>>(
    path: P,
    config: &PreprocessConfig,
) -> Result<PreprocessOutput, HubError> {
    let image = load_image(path).map_err(|e| HubError::ImageDecode(format!("{e:#}")))?;
    preprocess_dynamic_image(&image, config).map_err(|e| HubError::ImageDecode(format!("{e:#}")))
}
