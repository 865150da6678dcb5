//! Text pre-processing for the toxicity classifier.
//!
//! Raw comment text goes through [`TextNormalizer`](pre_processor::TextNormalizer)
//! and is then turned into fixed-length id sequences by
//! [`encode`](pre_processor::encode) using a [`Vocabulary`](pre_processor::Vocabulary)
//! that was built when the model was trained.
//!
//! ```rust
//! use toxicity_pre_processing::pre_processor::{
//!     NormalizationConfig, PaddingSide, TextNormalizer, Vocabulary, encode,
//! };
//!
//! let normalizer = TextNormalizer::new(NormalizationConfig::default());
//! let text = normalizer.normalize("You're GREAT :-)");
//! assert_eq!(text, "you are great happy ");
//!
//! let vocabulary = Vocabulary::from_word_index([("you", 1), ("are", 2), ("great", 3)]);
//! let encoded = encode(&[text], 6, &vocabulary, PaddingSide::Post);
//! assert_eq!(encoded[0].ids(), &[1, 2, 3, 0, 0, 0]);
//! ```

pub mod pre_processor;
