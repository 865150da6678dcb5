use std::sync::Arc;

use ndarray::ArrayView2;

use crate::error::ModelError;

mod onnx;
mod threshold;

pub use onnx::{InputKind, OnnxModel, OnnxModelConfig};
pub use threshold::CLASSIFICATION_THRESHOLD;

/// A trained classifier seen from the outside: a batch of fixed-length id
/// sequences in, one toxicity probability per sequence out.
///
/// The batch has shape `[batch_size, sequence_length]`. Implementations must
/// return exactly `batch_size` scores in row order. They are shared between
/// request handlers, so any interior state needs its own synchronization.
pub trait SequenceModel: Send + Sync {
    /// Sequence length the model was trained with, when the backend knows it.
    fn sequence_length(&self) -> Option<usize>;

    fn predict(&self, batch: ArrayView2<'_, u32>) -> Result<Vec<f32>, ModelError>;
}

impl<M: SequenceModel + ?Sized> SequenceModel for Arc<M> {
    fn sequence_length(&self) -> Option<usize> {
        (**self).sequence_length()
    }

    fn predict(&self, batch: ArrayView2<'_, u32>) -> Result<Vec<f32>, ModelError> {
        (**self).predict(batch)
    }
}

impl<M: SequenceModel + ?Sized> SequenceModel for Box<M> {
    fn sequence_length(&self) -> Option<usize> {
        (**self).sequence_length()
    }

    fn predict(&self, batch: ArrayView2<'_, u32>) -> Result<Vec<f32>, ModelError> {
        (**self).predict(batch)
    }
}

impl<M: SequenceModel + ?Sized> SequenceModel for &M {
    fn sequence_length(&self) -> Option<usize> {
        (**self).sequence_length()
    }

    fn predict(&self, batch: ArrayView2<'_, u32>) -> Result<Vec<f32>, ModelError> {
        (**self).predict(batch)
    }
}
