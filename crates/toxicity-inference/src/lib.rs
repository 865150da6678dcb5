//! # toxicity-inference
//!
//! Classify comment text as toxic or non-toxic with a pre-trained sequence
//! model.
//!
//! Raw text goes through the normalizer and vocabulary encoder from
//! `toxicity-pre-processing`, the resulting fixed-length id matrix is fed to
//! a [`SequenceModel`] in a single call, and each probability is turned into a
//! [`PredictionResult`] with an inclusive threshold.
//!
//! ## Quick Start
//!
//! ```no_run
//! use toxicity_inference::{InferenceConfig, Predictor};
//!
//! let config = InferenceConfig::from_file("toxicity.json")?.apply_env()?;
//! let predictor = Predictor::from_config(&config)?;
//!
//! let result = predictor.predict("You are a wonderful person")?;
//! println!("{}: {:.2}%", result.classification(), result.toxicity_score * 100.0);
//! # Ok::<(), toxicity_inference::PredictError>(())
//! ```
//!
//! ## Custom Model Backend
//!
//! Anything implementing [`SequenceModel`] can stand in for the ONNX session,
//! which is how the tests run without a model file.
//!
//! ```rust
//! use ndarray::ArrayView2;
//! use toxicity_inference::{ModelError, Predictor, SequenceModel};
//! use toxicity_pre_processing::pre_processor::Vocabulary;
//!
//! struct AlwaysToxic;
//!
//! impl SequenceModel for AlwaysToxic {
//!     fn sequence_length(&self) -> Option<usize> {
//!         None
//!     }
//!
//!     fn predict(&self, batch: ArrayView2<'_, u32>) -> Result<Vec<f32>, ModelError> {
//!         Ok(vec![0.9; batch.nrows()])
//!     }
//! }
//!
//! let vocabulary = Vocabulary::from_word_index([("hello", 1), ("world", 2)]);
//! let predictor = Predictor::new(vocabulary, AlwaysToxic)?.with_threshold(0.95)?;
//! let results = predictor.predict_batch(&["hello", "world"])?;
//! assert_eq!(results.len(), 2);
//! assert!(!results[0].is_toxic);
//! # Ok::<(), toxicity_inference::PredictError>(())
//! ```

mod config;
mod error;
mod model;
mod pipeline;

use std::sync::Arc;

pub use config::{
    ENV_MAX_SEQUENCE_LENGTH, ENV_MODEL_PATH, ENV_THRESHOLD, ENV_VOCABULARY_PATH, InferenceConfig,
};
pub use error::{ModelError, PredictError};
pub use model::{CLASSIFICATION_THRESHOLD, InputKind, OnnxModel, OnnxModelConfig, SequenceModel};
pub use pipeline::{Classification, PredictionResult, check_sequence_length};
use toxicity_pre_processing::pre_processor::{
    EncodedSequence, EncoderParams, NormalizationConfig, PaddingSide, TextNormalizer, Vocabulary,
};
use tracing::info;

/// Builder struct for configuring and running predictions.
///
/// Holds the normalizer, the loaded vocabulary and the model. All three are
/// read-only after construction, so a `Predictor` can be shared across
/// threads behind an `Arc` and called concurrently.
#[derive(Clone)]
pub struct Predictor {
    normalizer: TextNormalizer,
    vocabulary: Arc<Vocabulary>,
    model: Arc<dyn SequenceModel>,
    params: EncoderParams,
    threshold: f32,
}

impl Predictor {
    /// Create a predictor with the default normalization, sequence length,
    /// padding and threshold.
    ///
    /// Fails with [`PredictError::InputShapeMismatch`] if the model declares
    /// a sequence length other than the default.
    pub fn new(
        vocabulary: Vocabulary,
        model: impl SequenceModel + 'static,
    ) -> Result<Self, PredictError> {
        Self::from_parts(
            TextNormalizer::default(),
            Arc::new(vocabulary),
            Arc::new(model),
            EncoderParams::default(),
            CLASSIFICATION_THRESHOLD,
        )
    }

    pub fn from_parts(
        normalizer: TextNormalizer,
        vocabulary: Arc<Vocabulary>,
        model: Arc<dyn SequenceModel>,
        params: EncoderParams,
        threshold: f32,
    ) -> Result<Self, PredictError> {
        config::check_threshold(threshold)?;
        pipeline::check_sequence_length(model.as_ref(), &params)?;
        Ok(Self {
            normalizer,
            vocabulary,
            model,
            params,
            threshold,
        })
    }

    /// Load the vocabulary and ONNX model named by `config`.
    ///
    /// Every failure here is a configuration error and should stop startup.
    pub fn from_config(config: &InferenceConfig) -> Result<Self, PredictError> {
        config.validate()?;
        let vocabulary_path = config.vocabulary_path.as_ref().ok_or_else(|| {
            PredictError::Configuration("no vocabulary path configured".to_owned())
        })?;
        let model_path = config
            .model_path
            .as_ref()
            .ok_or_else(|| PredictError::Configuration("no model path configured".to_owned()))?;

        let vocabulary = Vocabulary::load(vocabulary_path)?;
        let model = OnnxModel::from_file(model_path, config.model.clone()).map_err(|source| {
            PredictError::ModelLoad {
                path: model_path.clone(),
                source,
            }
        })?;
        info!(
            vocabulary_size = vocabulary.len(),
            max_sequence_length = config.max_sequence_length,
            padding = %config.padding,
            threshold = config.threshold,
            "Predictor ready"
        );

        Self::from_parts(
            TextNormalizer::new(config.normalization),
            Arc::new(vocabulary),
            Arc::new(model),
            config.encoder_params(),
            config.threshold,
        )
    }

    /// Set a custom classification threshold.
    ///
    /// - If P(toxic) >= threshold: classified as toxic
    /// - If P(toxic) < threshold: classified as non-toxic
    ///
    /// Thresholds outside [0, 1] or NaN are a configuration error.
    pub fn with_threshold(mut self, threshold: f32) -> Result<Self, PredictError> {
        config::check_threshold(threshold)?;
        self.threshold = threshold;
        Ok(self)
    }

    #[must_use]
    pub fn with_padding(mut self, padding: PaddingSide) -> Self {
        self.params = EncoderParams::new(self.params.max_sequence_length(), padding);
        self
    }

    /// Change the encoded sequence length. Checked against the model again.
    pub fn with_max_sequence_length(mut self, max_len: usize) -> Result<Self, PredictError> {
        if max_len == 0 {
            return Err(PredictError::Configuration(
                "max_sequence_length must be greater than zero".to_owned(),
            ));
        }
        self.params = EncoderParams::new(max_len, self.params.padding());
        pipeline::check_sequence_length(self.model.as_ref(), &self.params)?;
        Ok(self)
    }

    /// Replace the normalization switches, keeping the current tables.
    #[must_use]
    pub fn with_normalization(mut self, config: NormalizationConfig) -> Self {
        self.normalizer = self.normalizer.with_config(config);
        self
    }

    #[must_use]
    pub fn with_normalizer(mut self, normalizer: TextNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    #[must_use]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    #[must_use]
    pub fn encoder_params(&self) -> &EncoderParams {
        &self.params
    }

    #[must_use]
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    #[must_use]
    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    /// Predict a single text. Blank text is [`PredictError::EmptyInput`].
    pub fn predict<T: AsRef<str>>(&self, text: T) -> Result<PredictionResult, PredictError> {
        pipeline::predict(
            text.as_ref(),
            &self.normalizer,
            &self.vocabulary,
            self.model.as_ref(),
            &self.params,
            self.threshold,
        )
    }

    /// Predict a batch with one model call. Results keep input order.
    pub fn predict_batch<T: AsRef<str> + Sync>(
        &self,
        texts: &[T],
    ) -> Result<Vec<PredictionResult>, PredictError> {
        pipeline::predict_batch(
            texts,
            &self.normalizer,
            &self.vocabulary,
            self.model.as_ref(),
            &self.params,
            self.threshold,
        )
    }

    pub fn classify<T: AsRef<str>>(&self, text: T) -> Result<Classification, PredictError> {
        self.predict(text).map(|result| result.classification())
    }

    pub fn classify_batch<T: AsRef<str> + Sync>(
        &self,
        texts: &[T],
    ) -> Result<Vec<Classification>, PredictError> {
        self.predict_batch(texts).map(|results| {
            results
                .iter()
                .map(PredictionResult::classification)
                .collect()
        })
    }

    /// Normalized form of `text`, as the model would see it.
    #[must_use]
    pub fn normalize(&self, text: &str) -> String {
        self.normalizer.normalize(text)
    }

    /// Normalize and encode `texts` without running the model.
    #[must_use]
    pub fn encode<T: AsRef<str> + Sync>(&self, texts: &[T]) -> Vec<EncodedSequence> {
        let normalized = self.normalizer.normalize_batch(texts);
        self.params.encode(&normalized, &self.vocabulary)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::ArrayView2;

    use super::*;

    struct FixedLength(usize);

    impl SequenceModel for FixedLength {
        fn sequence_length(&self) -> Option<usize> {
            Some(self.0)
        }

        fn predict(&self, batch: ArrayView2<'_, u32>) -> Result<Vec<f32>, ModelError> {
            Ok(vec![0.1; batch.nrows()])
        }
    }

    fn vocabulary() -> Vocabulary {
        Vocabulary::from_word_index([("hello", 1), ("world", 2)])
    }

    #[test]
    fn test_threshold_accessor() {
        let predictor = Predictor::new(vocabulary(), FixedLength(210))
            .unwrap()
            .with_threshold(0.75)
            .unwrap();
        assert!((predictor.threshold() - 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn test_invalid_threshold_is_rejected() {
        for threshold in [f32::NAN, -0.01, 1.01] {
            let err = Predictor::new(vocabulary(), FixedLength(210))
                .unwrap()
                .with_threshold(threshold)
                .err()
                .expect("threshold outside [0, 1] must fail");
            assert!(err.is_configuration());
        }
    }

    #[test]
    fn test_default_threshold() {
        let predictor = Predictor::new(vocabulary(), FixedLength(210)).unwrap();
        assert!((predictor.threshold() - CLASSIFICATION_THRESHOLD).abs() < f32::EPSILON);
    }

    #[test]
    fn test_model_length_mismatch() {
        let err = Predictor::new(vocabulary(), FixedLength(100))
            .err()
            .expect("mismatched lengths must fail");
        assert!(matches!(
            err,
            PredictError::InputShapeMismatch {
                model: 100,
                encoder: 210
            }
        ));
    }

    #[test]
    fn test_with_max_sequence_length() {
        let predictor = Predictor::new(vocabulary(), FixedLength(210)).unwrap();
        assert!(predictor.clone().with_max_sequence_length(50).is_err());
        assert!(predictor.clone().with_max_sequence_length(0).is_err());
        let predictor = predictor.with_max_sequence_length(210).unwrap();
        assert_eq!(predictor.encoder_params().max_sequence_length(), 210);
    }

    #[test]
    fn test_encode_uses_normalizer() {
        let predictor = Predictor::new(vocabulary(), FixedLength(210))
            .unwrap()
            .with_padding(PaddingSide::Pre);
        let encoded = predictor.encode(&["HELLO, World!"]);
        assert_eq!(encoded[0].len(), 210);
        assert_eq!(&encoded[0].ids()[208..], &[1, 2]);
    }

    #[test]
    fn test_from_config_requires_paths() {
        let err = Predictor::from_config(&InferenceConfig::default())
            .err()
            .expect("no paths configured");
        assert!(err.is_configuration());
    }
}
