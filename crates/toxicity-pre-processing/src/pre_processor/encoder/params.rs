use serde::{Deserialize, Serialize};

use super::{encode, sequence::{EncodedSequence, PaddingSide}, vocabulary::Vocabulary};

/// Sequence length the classifier was trained with.
pub const DEFAULT_MAX_SEQUENCE_LENGTH: usize = 210;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderParams {
    /// Every encoded sequence has exactly this many ids.
    max_sequence_length: usize,
    padding: PaddingSide,
}

impl EncoderParams {
    #[must_use]
    pub fn new(max_sequence_length: usize, padding: PaddingSide) -> Self {
        Self {
            max_sequence_length,
            padding,
        }
    }

    #[must_use]
    pub fn max_sequence_length(&self) -> usize {
        self.max_sequence_length
    }

    #[must_use]
    pub fn padding(&self) -> PaddingSide {
        self.padding
    }

    /// Encode `texts` with these parameters.
    pub fn encode<T: AsRef<str> + Sync>(
        &self,
        texts: &[T],
        vocabulary: &Vocabulary,
    ) -> Vec<EncodedSequence> {
        encode(texts, self.max_sequence_length, vocabulary, self.padding)
    }
}

impl Default for EncoderParams {
    fn default() -> Self {
        Self {
            max_sequence_length: DEFAULT_MAX_SEQUENCE_LENGTH,
            padding: PaddingSide::Post,
        }
    }
}

impl From<(usize, PaddingSide)> for EncoderParams {
    fn from(value: (usize, PaddingSide)) -> Self {
        Self::new(value.0, value.1)
    }
}
