use std::{fmt, time::Duration};

use thiserror::Error;

/// Failures surfaced by the inference adapters.
///
/// Adapters never fall back to a label: every failure reaches the caller as one of these.
#[derive(Debug, Error)]
pub enum HubError {
    /// Raised by front ends before an adapter is invoked.
    #[error("input is empty")]
    EmptyInput,
    #[error("failed to decode image: {0}")]
    ImageDecode(String),
    #[error("model inference failed: {0}")]
    ModelInference(String),
    #[error("model inference did not finish within {0:?}")]
    Timeout(Duration),
    #[error("vocabulary unavailable: {0}")]
    VocabularyUnavailable(String),
    #[error("failed to load model: {0}")]
    ModelLoad(String),
}

/// Stable, message-free discriminant of a [`HubError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    EmptyInput,
    ImageDecodeError,
    ModelInferenceError,
    Timeout,
    VocabularyUnavailable,
    ModelLoadError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::EmptyInput => "EmptyInput",
            ErrorKind::ImageDecodeError => "ImageDecodeError",
            ErrorKind::ModelInferenceError => "ModelInferenceError",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::VocabularyUnavailable => "VocabularyUnavailable",
            ErrorKind::ModelLoadError => "ModelLoadError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl HubError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HubError::EmptyInput => ErrorKind::EmptyInput,
            HubError::ImageDecode(_) => ErrorKind::ImageDecodeError,
            HubError::ModelInference(_) => ErrorKind::ModelInferenceError,
            HubError::Timeout(_) => ErrorKind::Timeout,
            HubError::VocabularyUnavailable(_) => ErrorKind::VocabularyUnavailable,
            HubError::ModelLoad(_) => ErrorKind::ModelLoadError,
        }
    }

    /// Wrap a backend failure, keeping the full `anyhow` context chain in the message.
    pub(crate) fn inference(err: anyhow::Error) -> Self {
        HubError::ModelInference(format!("{err:#}"))
    }

    pub(crate) fn load(err: anyhow::Error) -> Self {
        HubError::ModelLoad(format!("{err:#}"))
    }
}
