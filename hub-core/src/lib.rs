//! Core inference adapters for the prediction hub.
//!
//! This crate turns review text and scan images into model-ready tensors, runs them through a
//! loaded model with `tract-onnx` or a JSON-serialized classical backend, and maps the raw output
//! to a human-readable label.

/// JSON-serialized perceptron and dense network backends.
pub mod classical;
/// Typed failures surfaced by the adapters.
pub mod error;
/// Model input variants, the `Predictor` seam, and shared model handles.
pub mod model;
/// ONNX model loading and execution.
pub mod onnx;
/// Image pre-processing (resizing, tensor conversion).
pub mod preprocess;
/// Artifact lookup for the selectable models.
pub mod registry;
/// Review sentiment adapter.
pub mod sentiment;
/// Fixed-length token sequences.
pub mod sequence;
/// Tumor detection adapter.
pub mod tumor;
/// Word-to-index vocabulary.
pub mod vocabulary;

pub use error::{ErrorKind, HubError};
pub use model::{ModelHandle, ModelInput, Predictor};
pub use onnx::{InputPin, OnnxModel};
pub use preprocess::{
    InputSize, PreprocessConfig, PreprocessOutput, TUMOR_INPUT_SIZE, preprocess_dynamic_image,
    preprocess_image, preprocess_image_bytes,
};
pub use registry::{SentimentModel, load_tumor_model, sequence_input_pin, tumor_input_pin};
pub use sentiment::{SentimentClassifier, SentimentLabel, classify_sentiment};
pub use sequence::{SEQUENCE_LEN, TokenSequence, pad_sequence};
pub use tumor::{TumorDetector, TumorLabel, detect_tumor, detect_tumor_image, detect_tumor_with};
pub use vocabulary::Vocabulary;

/// Returns the crate version for diagnostics.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
