use std::{path::Path, sync::Mutex};

use ndarray::ArrayView2;
use ort::{
    session::{Session, SessionOutputs, builder::GraphOptimizationLevel},
    value::{Tensor, ValueType},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::SequenceModel;
use crate::error::ModelError;

/// Element type of the model's input tensor.
///
/// Keras exports usually take `float32` ids; graphs with an explicit
/// embedding lookup take `int64`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    #[default]
    Float,
    Int64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnnxModelConfig {
    /// Sequence length the network was exported with. Left unset, it is read
    /// from the graph when the input's second dimension is fixed.
    pub sequence_length: Option<usize>,
    pub input_kind: InputKind,
    /// Which graph output holds the toxicity probabilities. Multi-head
    /// models put the main target first.
    pub output_index: usize,
    pub intra_threads: usize,
}

impl Default for OnnxModelConfig {
    fn default() -> Self {
        Self {
            sequence_length: None,
            input_kind: InputKind::Float,
            output_index: 0,
            intra_threads: 4,
        }
    }
}

/// [`SequenceModel`] backed by an ONNX Runtime session.
///
/// Running a session needs exclusive access, so concurrent callers are
/// serialized on a mutex.
pub struct OnnxModel {
    session: Mutex<Session>,
    config: OnnxModelConfig,
}

fn backend_error(err: impl std::fmt::Display) -> ModelError {
    ModelError::Backend(err.to_string())
}

impl OnnxModel {
    pub fn from_file(path: impl AsRef<Path>, config: OnnxModelConfig) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let session = Session::builder()
            .map_err(backend_error)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(backend_error)?
            .with_intra_threads(config.intra_threads)
            .map_err(backend_error)?
            .commit_from_file(path)
            .map_err(backend_error)?;
        let model = Self::from_session(session, config)?;
        info!(path = %path.display(), config = ?model.config, "Loaded ONNX model");
        Ok(model)
    }

    pub fn from_memory(bytes: &[u8], config: OnnxModelConfig) -> Result<Self, ModelError> {
        let session = Session::builder()
            .map_err(backend_error)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(backend_error)?
            .with_intra_threads(config.intra_threads)
            .map_err(backend_error)?
            .commit_from_memory(bytes)
            .map_err(backend_error)?;
        Self::from_session(session, config)
    }

    /// Wrap a committed session.
    ///
    /// Fails when the graph's fixed sequence length contradicts
    /// `config.sequence_length`.
    pub fn from_session(session: Session, mut config: OnnxModelConfig) -> Result<Self, ModelError> {
        let graph_length = session.inputs.first().and_then(|input| match &input.input_type {
            ValueType::Tensor { shape, .. } => shape.get(1).copied(),
            _ => None,
        });
        config.sequence_length = resolve_sequence_length(config.sequence_length, graph_length)?;
        debug!(
            ?graph_length,
            sequence_length = ?config.sequence_length,
            "Resolved model sequence length"
        );
        Ok(Self {
            session: Mutex::new(session),
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &OnnxModelConfig {
        &self.config
    }
}

/// Combine the configured sequence length with the graph's input dimension.
///
/// Dynamic dimensions are reported as zero or negative and carry no length.
fn resolve_sequence_length(
    configured: Option<usize>,
    graph_dimension: Option<i64>,
) -> Result<Option<usize>, ModelError> {
    let graph = graph_dimension
        .filter(|&dim| dim > 0)
        .and_then(|dim| usize::try_from(dim).ok());
    match (configured, graph) {
        (Some(configured), Some(graph)) if configured != graph => {
            Err(ModelError::SequenceLength { configured, graph })
        }
        (Some(len), _) | (None, Some(len)) => Ok(Some(len)),
        (None, None) => Ok(None),
    }
}

fn run_model_inference<'s>(
    session: &'s mut Session,
    batch: ArrayView2<'_, u32>,
    input_kind: InputKind,
) -> Result<SessionOutputs<'s>, ModelError> {
    let input_name = session.inputs[0].name.clone();
    let shape = batch.shape().to_vec();
    let outputs = match input_kind {
        InputKind::Float => {
            let data = batch.iter().map(|&id| id as f32).collect::<Box<[f32]>>();
            let input = Tensor::from_array((shape, data))?;
            session.run(ort::inputs![input_name => input])?
        }
        InputKind::Int64 => {
            let data = batch.iter().map(|&id| i64::from(id)).collect::<Box<[i64]>>();
            let input = Tensor::from_array((shape, data))?;
            session.run(ort::inputs![input_name => input])?
        }
    };
    Ok(outputs)
}

/// Flattens the probability output into one score per row
fn parse_model_outputs(
    outputs: &SessionOutputs<'_>,
    output_index: usize,
    batch_size: usize,
) -> Result<Vec<f32>, ModelError> {
    if output_index >= outputs.len() {
        return Err(ModelError::MissingOutput {
            index: output_index,
            available: outputs.len(),
        });
    }
    // Shape is [batch] or [batch, 1]
    let scores = outputs[output_index]
        .try_extract_array::<f32>()?
        .iter()
        .copied()
        .collect::<Vec<_>>();

    if scores.len() != batch_size {
        return Err(ModelError::OutputCount {
            expected: batch_size,
            actual: scores.len(),
        });
    }
    Ok(scores)
}

impl SequenceModel for OnnxModel {
    fn sequence_length(&self) -> Option<usize> {
        self.config.sequence_length
    }

    fn predict(&self, batch: ArrayView2<'_, u32>) -> Result<Vec<f32>, ModelError> {
        let batch_size = batch.nrows();
        debug!(batch_size, sequence_length = batch.ncols(), "Running ONNX inference");
        let mut session = self.session.lock().map_err(|_| ModelError::Poisoned)?;
        let outputs = run_model_inference(&mut session, batch, self.config.input_kind)?;
        parse_model_outputs(&outputs, self.config.output_index, batch_size)
    }
}
