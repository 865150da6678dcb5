use std::path::PathBuf;

use thiserror::Error;
use toxicity_pre_processing::pre_processor::VocabularyError;

/// Failure inside a model backend.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("ONNX Runtime error")]
    Ort(#[from] ort::Error),
    #[error("model backend error: {0}")]
    Backend(String),
    #[error("model returned {actual} scores for a batch of {expected}")]
    OutputCount { expected: usize, actual: usize },
    #[error("model returned a non-finite score at position {index}")]
    InvalidScore { index: usize },
    #[error("model has no output at index {index} ({available} available)")]
    MissingOutput { index: usize, available: usize },
    #[error("configured sequence length {configured} does not match the model input length {graph}")]
    SequenceLength { configured: usize, graph: usize },
    #[error("model session lock was poisoned by a panicking request")]
    Poisoned,
    #[error("invalid input batch shape")]
    Shape(#[from] ndarray::ShapeError),
}

/// Errors returned by the prediction pipeline.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("failed to load vocabulary")]
    Vocabulary(#[from] VocabularyError),
    #[error("failed to load model from {}", path.display())]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: ModelError,
    },
    #[error("no input text was provided")]
    EmptyInput,
    #[error("model expects sequences of length {model} but the encoder produces length {encoder}")]
    InputShapeMismatch { model: usize, encoder: usize },
    #[error("model inference failed")]
    Inference(#[from] ModelError),
}

impl PredictError {
    /// Whether the error comes from how the service was set up rather than
    /// from the request. These are fatal at startup.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_)
                | Self::Vocabulary(_)
                | Self::ModelLoad { .. }
                | Self::InputShapeMismatch { .. }
        )
    }
}
