//! Fixed-length token sequences for the sentiment models.

use ndarray::Array2;

use crate::{
    model::ModelInput,
    vocabulary::{UNKNOWN_INDEX, Vocabulary},
};

/// Length every sequence is padded or truncated to.
pub const SEQUENCE_LEN: usize = 500;
/// Fill value for left padding.
pub const PAD_INDEX: u32 = UNKNOWN_INDEX;

/// Exactly [`SEQUENCE_LEN`] token indices, most recent token last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSequence(Vec<u32>);

impl TokenSequence {
    /// Split `text` on whitespace and map every token through `vocabulary`.
    ///
    /// No punctuation stripping or case folding happens here.
    pub fn encode(text: &str, vocabulary: &Vocabulary) -> Self {
        let indices: Vec<u32> = text
            .split_whitespace()
            .map(|word| vocabulary.lookup(word))
            .collect();
        Self::from_indices(&indices)
    }

    /// Pad or truncate raw indices to [`SEQUENCE_LEN`].
    pub fn from_indices(indices: &[u32]) -> Self {
        Self(pad_sequence(indices, SEQUENCE_LEN))
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    /// Wrap the sequence as a single-row batch of shape `[1, SEQUENCE_LEN]`.
    pub fn to_model_input(&self) -> ModelInput {
        let batch = Array2::from_shape_fn((1, SEQUENCE_LEN), |(_, col)| i64::from(self.0[col]));
        ModelInput::Tokens(batch)
    }
}

/// Left-pad with [`PAD_INDEX`] or keep only the last `len` entries.
pub fn pad_sequence(indices: &[u32], len: usize) -> Vec<u32> {
    if indices.len() >= len {
        return indices[indices.len() - len..].to_vec();
    }
    let mut padded = vec![PAD_INDEX; len - indices.len()];
    padded.extend_from_slice(indices);
    padded
}
