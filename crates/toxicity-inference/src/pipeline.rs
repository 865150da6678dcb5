use core::fmt;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use toxicity_pre_processing::pre_processor::{EncoderParams, TextNormalizer, Vocabulary};
use tracing::debug;

use crate::{
    error::{ModelError, PredictError},
    model::SequenceModel,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    NonToxic,
    Toxic,
}

impl Classification {
    #[inline]
    #[must_use]
    pub fn from_score(score: f32, threshold: f32) -> Self {
        if score >= threshold {
            Self::Toxic
        } else {
            Self::NonToxic
        }
    }

    #[must_use]
    pub fn is_toxic(&self) -> bool {
        matches!(self, Self::Toxic)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonToxic => write!(f, "Non-toxic"),
            Self::Toxic => write!(f, "Toxic"),
        }
    }
}

impl From<Classification> for i64 {
    fn from(class: Classification) -> Self {
        match class {
            Classification::NonToxic => 0,
            Classification::Toxic => 1,
        }
    }
}

/// Outcome of classifying one input text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// The text as submitted, before normalization.
    pub original_text: String,
    pub is_toxic: bool,
    /// P(toxic) as returned by the model.
    pub toxicity_score: f32,
}

impl PredictionResult {
    #[must_use]
    pub fn new(original_text: impl Into<String>, toxicity_score: f32, threshold: f32) -> Self {
        Self {
            original_text: original_text.into(),
            is_toxic: Classification::from_score(toxicity_score, threshold).is_toxic(),
            toxicity_score,
        }
    }

    #[must_use]
    pub fn classification(&self) -> Classification {
        if self.is_toxic {
            Classification::Toxic
        } else {
            Classification::NonToxic
        }
    }
}

impl fmt::Display for PredictionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (P(toxic)={:.3})",
            self.classification(),
            self.toxicity_score
        )
    }
}

/// Fails when the model was exported for a different sequence length than
/// the encoder produces.
pub fn check_sequence_length<M: SequenceModel + ?Sized>(
    model: &M,
    params: &EncoderParams,
) -> Result<(), PredictError> {
    match model.sequence_length() {
        Some(model_len) if model_len != params.max_sequence_length() => {
            Err(PredictError::InputShapeMismatch {
                model: model_len,
                encoder: params.max_sequence_length(),
            })
        }
        _ => Ok(()),
    }
}

fn prepare_input_for_inference(
    normalizer: &TextNormalizer,
    vocabulary: &Vocabulary,
    params: &EncoderParams,
    texts: &[impl AsRef<str> + Sync],
) -> Result<Array2<u32>, ModelError> {
    let normalized = normalizer.normalize_batch(texts);
    let encoded = params.encode(&normalized, vocabulary);
    let data = encoded
        .into_iter()
        .flat_map(|seq| seq.into_ids())
        .collect::<Vec<_>>();
    Ok(Array2::from_shape_vec(
        (texts.len(), params.max_sequence_length()),
        data,
    )?)
}

fn validate_scores(scores: &[f32], expected: usize) -> Result<(), ModelError> {
    if scores.len() != expected {
        return Err(ModelError::OutputCount {
            expected,
            actual: scores.len(),
        });
    }
    if let Some(index) = scores.iter().position(|score| !score.is_finite()) {
        return Err(ModelError::InvalidScore { index });
    }
    Ok(())
}

/// Classify a batch of raw texts.
///
/// Each text is normalized, the batch is encoded into a
/// `[texts.len(), max_sequence_length]` matrix, and the model is invoked
/// once on the whole matrix. Results come back in input order, each
/// carrying the original text. The batch is atomic: any failure fails the
/// whole call.
pub fn predict_batch<T, M>(
    texts: &[T],
    normalizer: &TextNormalizer,
    vocabulary: &Vocabulary,
    model: &M,
    params: &EncoderParams,
    threshold: f32,
) -> Result<Vec<PredictionResult>, PredictError>
where
    T: AsRef<str> + Sync,
    M: SequenceModel + ?Sized,
{
    if texts.is_empty() {
        return Err(PredictError::EmptyInput);
    }
    check_sequence_length(model, params)?;

    let input = prepare_input_for_inference(normalizer, vocabulary, params, texts)?;
    let scores = model.predict(input.view())?;
    validate_scores(&scores, texts.len())?;

    let results = texts
        .iter()
        .zip(scores)
        .map(|(text, score)| PredictionResult::new(text.as_ref(), score, threshold))
        .collect::<Vec<_>>();
    debug!(
        batch_size = results.len(),
        toxic = results.iter().filter(|r| r.is_toxic).count(),
        threshold,
        "Classified batch"
    );
    Ok(results)
}

/// Classify one text. Blank input is rejected, unlike inside a batch.
pub fn predict<M: SequenceModel + ?Sized>(
    text: &str,
    normalizer: &TextNormalizer,
    vocabulary: &Vocabulary,
    model: &M,
    params: &EncoderParams,
    threshold: f32,
) -> Result<PredictionResult, PredictError> {
    if text.trim().is_empty() {
        return Err(PredictError::EmptyInput);
    }
    let mut results = predict_batch(&[text], normalizer, vocabulary, model, params, threshold)?;
    results.pop().ok_or(PredictError::EmptyInput)
}

#[cfg(test)]
mod tests {
    use ndarray::ArrayView2;

    use super::*;

    struct ConstantModel(f32);

    impl SequenceModel for ConstantModel {
        fn sequence_length(&self) -> Option<usize> {
            None
        }

        fn predict(&self, batch: ArrayView2<'_, u32>) -> Result<Vec<f32>, ModelError> {
            Ok(vec![self.0; batch.nrows()])
        }
    }

    #[test]
    fn classification_threshold_is_inclusive() {
        assert_eq!(Classification::from_score(0.5, 0.5), Classification::Toxic);
        assert_eq!(
            Classification::from_score(0.499_99, 0.5),
            Classification::NonToxic
        );
    }

    #[test]
    fn classification_to_i64() {
        assert_eq!(i64::from(Classification::NonToxic), 0);
        assert_eq!(i64::from(Classification::Toxic), 1);
    }

    #[test]
    fn prediction_result_serializes_with_snake_case_keys() {
        let result = PredictionResult::new("you idiot", 0.75, 0.5);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["original_text"], "you idiot");
        assert_eq!(json["is_toxic"], true);
        assert!((json["toxicity_score"].as_f64().unwrap() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn non_finite_scores_are_rejected() {
        let err = validate_scores(&[0.1, f32::NAN], 2).unwrap_err();
        assert!(matches!(err, ModelError::InvalidScore { index: 1 }));
    }

    #[test]
    fn empty_batch_is_rejected() {
        let texts: [&str; 0] = [];
        let err = predict_batch(
            &texts,
            &TextNormalizer::default(),
            &Vocabulary::from_word_index([("hello", 1)]),
            &ConstantModel(0.2),
            &EncoderParams::default(),
            0.5,
        )
        .unwrap_err();
        assert!(matches!(err, PredictError::EmptyInput));
    }

    #[test]
    fn single_blank_text_is_rejected() {
        let err = predict(
            "   ",
            &TextNormalizer::default(),
            &Vocabulary::from_word_index([("hello", 1)]),
            &ConstantModel(0.2),
            &EncoderParams::default(),
            0.5,
        )
        .unwrap_err();
        assert!(matches!(err, PredictError::EmptyInput));
    }

    #[test]
    fn original_text_is_kept() {
        let result = predict(
            "HELLO <b>there</b>",
            &TextNormalizer::default(),
            &Vocabulary::from_word_index([("hello", 1)]),
            &ConstantModel(0.9),
            &EncoderParams::default(),
            0.5,
        )
        .unwrap();
        assert_eq!(result.original_text, "HELLO <b>there</b>");
        assert!(result.is_toxic);
        assert_eq!(result.to_string(), "Toxic (P(toxic)=0.900)");
    }
}
