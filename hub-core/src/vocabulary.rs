//! Word-to-index lookup table used to tokenize reviews.

use std::{collections::HashMap, fs, path::Path};

use anyhow::Context;
use log::debug;

use crate::error::HubError;

/// Index returned for words missing from the vocabulary.
///
/// This is the same value used to pad short sequences, so an unknown word and padding are
/// indistinguishable to the model.
pub const UNKNOWN_INDEX: u32 = 0;

/// Immutable word-to-index mapping, built once and shared read-only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    index: HashMap<String, u32>,
}

impl Vocabulary {
    /// Build a vocabulary from `(word, index)` pairs. Later duplicates win.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        Self {
            index: pairs
                .into_iter()
                .map(|(word, idx)| (word.into(), idx))
                .collect(),
        }
    }

    /// Parse a flat JSON object of `{"word": index}` entries.
    pub fn from_json_str(json: &str) -> Result<Self, HubError> {
        let index: HashMap<String, u32> = serde_json::from_str(json)
            .map_err(|e| HubError::VocabularyUnavailable(format!("invalid word index JSON: {e}")))?;
        Ok(Self { index })
    }

    /// Load a word index file such as the IMDB `word_index.json`.
    pub fn from_json_path<P: AsRef<Path>>(path: P) -> Result<Self, HubError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read word index {}", path.display()))
            .map_err(|e| HubError::VocabularyUnavailable(format!("{e:#}")))?;
        let vocabulary = Self::from_json_str(&contents).map_err(|err| match err {
            HubError::VocabularyUnavailable(msg) => {
                HubError::VocabularyUnavailable(format!("{}: {msg}", path.display()))
            }
            other => other,
        })?;
        debug!(
            "loaded vocabulary of {} words from {}",
            vocabulary.len(),
            path.display()
        );
        Ok(vocabulary)
    }

    /// Index of `word`, or [`UNKNOWN_INDEX`]. Matching is exact: no case folding.
    pub fn lookup(&self, word: &str) -> u32 {
        self.index.get(word).copied().unwrap_or(UNKNOWN_INDEX)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.index.contains_key(word)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
