//! Review text in, sentiment label out.

use std::{fmt, sync::Arc};

use log::debug;
use ndarray::{ArrayD, Axis};

use crate::{error::HubError, model::ModelHandle, sequence::TokenSequence, vocabulary::Vocabulary};
use hub_utils::timing_guard;

/// Scores strictly above this are positive.
pub const POSITIVE_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SentimentLabel {
    Positive,
    Negative,
}

impl SentimentLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            SentimentLabel::Positive => "Positive",
            SentimentLabel::Negative => "Negative",
        }
    }

    /// Apply the fixed decision rule: `score > 0.5` is positive.
    pub fn from_score(score: f32) -> Self {
        if score > POSITIVE_THRESHOLD {
            SentimentLabel::Positive
        } else {
            SentimentLabel::Negative
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a review.
///
/// `text` must already be validated as non-blank by the caller; blank text is not rejected
/// here and simply encodes to an all-padding sequence.
pub fn classify_sentiment(
    text: &str,
    vocabulary: &Vocabulary,
    model: &ModelHandle,
) -> Result<SentimentLabel, HubError> {
    let sequence = {
        let _guard = timing_guard("hub_core::encode_review", log::Level::Trace);
        TokenSequence::encode(text, vocabulary)
    };

    let output = {
        let _guard = timing_guard("hub_core::sentiment_inference", log::Level::Debug);
        model.predict(sequence.to_model_input())?
    };

    let score = score_from_output(&output)?;
    let label = SentimentLabel::from_score(score);
    debug!("'{}' scored {score:.4} -> {label}", model.name());
    Ok(label)
}

/// Reduce raw model output to one score.
///
/// Batched output is unwrapped to its first entry, which must then hold exactly one finite value.
pub fn score_from_output(output: &ArrayD<f32>) -> Result<f32, HubError> {
    let first = if output.ndim() == 0 {
        output.view()
    } else {
        if output.len_of(Axis(0)) == 0 {
            return Err(HubError::ModelInference(
                "model returned an empty prediction".to_string(),
            ));
        }
        output.index_axis(Axis(0), 0)
    };

    let mut values = first.iter();
    let score = match (values.next(), values.next()) {
        (Some(&score), None) => score,
        (None, _) => {
            return Err(HubError::ModelInference(
                "model returned an empty prediction".to_string(),
            ));
        }
        (Some(_), Some(_)) => {
            return Err(HubError::ModelInference(format!(
                "expected a single score per review, got output of shape {:?}",
                output.shape()
            )));
        }
    };

    if !score.is_finite() {
        return Err(HubError::ModelInference(format!(
            "model returned a non-finite score ({score})"
        )));
    }
    Ok(score)
}

/// A vocabulary paired with a loaded model, for repeated classification.
#[derive(Debug, Clone)]
pub struct SentimentClassifier {
    vocabulary: Arc<Vocabulary>,
    model: ModelHandle,
}

impl SentimentClassifier {
    pub fn new(vocabulary: Arc<Vocabulary>, model: ModelHandle) -> Self {
        Self { vocabulary, model }
    }

    pub fn classify(&self, text: &str) -> Result<SentimentLabel, HubError> {
        classify_sentiment(text, &self.vocabulary, &self.model)
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ErrorKind,
        model::{ModelInput, testing::*},
        sequence::SEQUENCE_LEN,
    };
    use ndarray::IxDyn;

    fn movie_vocab() -> Vocabulary {
        Vocabulary::from_pairs([("the", 4), ("movie", 8), ("was", 16), ("bad", 320)])
    }

    #[test]
    fn low_score_is_negative() {
        let model = ModelHandle::new("fixed", FixedOutput::scalar_batch(0.2));
        let label = classify_sentiment("the movie was bad", &movie_vocab(), &model).unwrap();
        assert_eq!(label, SentimentLabel::Negative);
        assert_eq!(label.to_string(), "Negative");
    }

    #[test]
    fn model_sees_padded_single_row_batch() {
        let fixed = FixedOutput::scalar_batch(0.9);
        let seen = fixed.seen.clone();
        let model = ModelHandle::new("fixed", fixed);
        classify_sentiment("the movie was bad", &movie_vocab(), &model).unwrap();

        let input = seen.lock().unwrap().clone().expect("model was called");
        let ModelInput::Tokens(batch) = input else {
            panic!("expected token input");
        };
        assert_eq!(batch.shape(), &[1, SEQUENCE_LEN]);
        let row: Vec<i64> = batch.row(0).to_vec();
        assert!(row[..SEQUENCE_LEN - 4].iter().all(|&t| t == 0));
        assert_eq!(&row[SEQUENCE_LEN - 4..], &[4, 8, 16, 320]);
    }

    #[test]
    fn only_last_tokens_reach_the_model() {
        let vocab = Vocabulary::from_pairs([("meh", 3), ("good", 50)]);
        let mut words = vec!["meh"; 100];
        words.extend(std::iter::repeat_n("good", 500));
        let text = words.join(" ");

        let fixed = FixedOutput::scalar_batch(0.9);
        let seen = fixed.seen.clone();
        let model = ModelHandle::new("fixed", fixed);
        let label = classify_sentiment(&text, &vocab, &model).unwrap();
        assert_eq!(label, SentimentLabel::Positive);

        let input = seen.lock().unwrap().clone().expect("model was called");
        let ModelInput::Tokens(batch) = input else {
            panic!("expected token input");
        };
        assert!(batch.iter().all(|&t| t == 50));
    }

    #[test]
    fn threshold_is_strict() {
        assert_eq!(SentimentLabel::from_score(0.5), SentimentLabel::Negative);
        assert_eq!(
            SentimentLabel::from_score(0.500_001),
            SentimentLabel::Positive
        );
        assert_eq!(SentimentLabel::from_score(-3.0), SentimentLabel::Negative);
    }

    #[test]
    fn score_unwraps_batched_and_scalar_outputs() {
        let scalar = ArrayD::from_elem(IxDyn(&[]), 0.7);
        assert_eq!(score_from_output(&scalar).unwrap(), 0.7);

        let flat = ArrayD::from_shape_vec(IxDyn(&[1]), vec![1.0]).unwrap();
        assert_eq!(score_from_output(&flat).unwrap(), 1.0);

        let nested = ArrayD::from_shape_vec(IxDyn(&[1, 1]), vec![0.25]).unwrap();
        assert_eq!(score_from_output(&nested).unwrap(), 0.25);
    }

    #[test]
    fn ambiguous_or_empty_outputs_are_errors() {
        let two_scores = ArrayD::from_shape_vec(IxDyn(&[1, 2]), vec![0.1, 0.9]).unwrap();
        let err = score_from_output(&two_scores).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelInferenceError);

        let empty = ArrayD::<f32>::zeros(IxDyn(&[0, 1]));
        assert_eq!(
            score_from_output(&empty).unwrap_err().kind(),
            ErrorKind::ModelInferenceError
        );

        let nan = ArrayD::from_elem(IxDyn(&[1, 1]), f32::NAN);
        assert!(score_from_output(&nan).is_err());
    }

    #[test]
    fn failing_model_surfaces_typed_error() {
        let model = ModelHandle::new("broken", Failing("bad graph"));
        let err = classify_sentiment("bad", &movie_vocab(), &model).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelInferenceError);
    }

    #[test]
    fn classifier_wraps_vocabulary_and_model() {
        let classifier = SentimentClassifier::new(
            Arc::new(movie_vocab()),
            ModelHandle::new("fixed", FixedOutput::new(&[1], &[0.51])),
        );
        assert_eq!(
            classifier.classify("the movie").unwrap(),
            SentimentLabel::Positive
        );
        assert_eq!(classifier.vocabulary().len(), 4);
    }
}
