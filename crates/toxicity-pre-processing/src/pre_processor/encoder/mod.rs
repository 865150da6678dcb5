mod params;
mod sequence;
mod tokenizer;
mod vocabulary;

pub use params::{DEFAULT_MAX_SEQUENCE_LENGTH, EncoderParams};
pub use sequence::{EncodedSequence, PaddingSide, pad_sequence};
pub use tokenizer::{DEFAULT_FILTERS, TokenizerConfig};
use tracing::debug;
pub use vocabulary::{Vocabulary, VocabularyError};

use super::parallel;

/// Id used for padding. Never assigned to a word.
pub const PAD_ID: u32 = 0;

/// Encode each text into exactly `max_len` vocabulary ids.
///
/// Words are split with the vocabulary's own [`TokenizerConfig`], mapped to
/// ids following its OOV policy, then padded or truncated on the `padding`
/// side. Output order matches input order; blank texts become all-padding
/// sequences rather than errors.
pub fn encode<T: AsRef<str> + Sync>(
    texts: &[T],
    max_len: usize,
    vocabulary: &Vocabulary,
    padding: PaddingSide,
) -> Vec<EncodedSequence> {
    let encoded = parallel::map_texts(texts, |text| {
        EncodedSequence::encode(text, max_len, vocabulary, padding)
    });

    let oov_tokens = encoded.iter().map(EncodedSequence::oov_tokens).sum::<usize>();
    let truncated = encoded.iter().filter(|seq| seq.truncated_tokens() > 0).count();
    debug!(
        num_texts = texts.len(),
        max_len,
        %padding,
        oov_tokens,
        truncated_sequences = truncated,
        "Encoded texts"
    );
    encoded
}
