mod contractions;
mod emoticons;
mod encoder;
mod normalizer;
mod parallel;

pub use contractions::ContractionTable;
pub use emoticons::EmoticonTable;
pub use encoder::{
    DEFAULT_FILTERS, DEFAULT_MAX_SEQUENCE_LENGTH, EncodedSequence, EncoderParams, PAD_ID,
    PaddingSide, TokenizerConfig, Vocabulary, VocabularyError, encode, pad_sequence,
};
pub use normalizer::{NormalizationConfig, TextNormalizer, normalize, stages};
