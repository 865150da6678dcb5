mod config;
pub mod stages;

use std::sync::Arc;

pub use config::NormalizationConfig;
use tracing::debug;

use super::{contractions::ContractionTable, emoticons::EmoticonTable, parallel};

/// Normalize `text` with the built-in emoticon and contraction tables.
#[must_use]
pub fn normalize(text: &str, config: &NormalizationConfig) -> String {
    TextNormalizer::new(*config).normalize(text)
}

/// Runs the normalization stages over comment text.
///
/// Stages always run in this order, each one only when enabled in the
/// [`NormalizationConfig`]:
///
/// 1. HTML stripping
/// 2. accent folding
/// 3. lowercasing
/// 4. IP address, hyperlink and number removal
/// 5. emoticon substitution
/// 6. special character removal
/// 7. sentence-end-marker spacing (not in BERT mode)
/// 8. contraction expansion (not in BERT mode)
///
/// Reordering the stages changes the output. The result is not trimmed.
///
/// # Examples
///
/// ```
/// use toxicity_pre_processing::pre_processor::{NormalizationConfig, TextNormalizer};
///
/// let normalizer = TextNormalizer::new(NormalizationConfig::default());
/// assert_eq!(normalizer.normalize("I LOVE this! :-)"), "i love this ! happy ");
/// ```
#[derive(Clone, Debug)]
pub struct TextNormalizer {
    config: NormalizationConfig,
    emoticons: Arc<EmoticonTable>,
    contractions: Arc<ContractionTable>,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new(NormalizationConfig::default())
    }
}

impl TextNormalizer {
    /// Creates a normalizer backed by the built-in tables.
    #[must_use]
    pub fn new(config: NormalizationConfig) -> Self {
        Self::with_tables(config, EmoticonTable::builtin(), ContractionTable::builtin())
    }

    /// Creates a normalizer with caller-supplied tables.
    #[must_use]
    pub fn with_tables(
        config: NormalizationConfig,
        emoticons: Arc<EmoticonTable>,
        contractions: Arc<ContractionTable>,
    ) -> Self {
        Self {
            config,
            emoticons,
            contractions,
        }
    }

    /// Same tables, different switches.
    #[must_use]
    pub fn with_config(&self, config: NormalizationConfig) -> Self {
        Self {
            config,
            emoticons: Arc::clone(&self.emoticons),
            contractions: Arc::clone(&self.contractions),
        }
    }

    #[must_use]
    pub fn config(&self) -> &NormalizationConfig {
        &self.config
    }

    #[must_use]
    pub fn emoticons(&self) -> &EmoticonTable {
        &self.emoticons
    }

    #[must_use]
    pub fn contractions(&self) -> &ContractionTable {
        &self.contractions
    }

    pub fn normalize(&self, text: &str) -> String {
        let config = &self.config;
        let mut text = text.to_owned();

        if config.strip_html {
            text = stages::strip_html(&text);
        }
        if config.fold_accents {
            text = stages::fold_accents(&text);
        }
        if config.lowercase {
            text = stages::lowercase(&text);
        }
        if config.strip_ip_link_numbers {
            text = stages::strip_ip_links_numbers(
                &text,
                config.strip_ip_addresses,
                config.strip_hyperlinks,
                config.strip_numbers,
            );
        }
        if config.substitute_emoticons {
            text = self.emoticons.expand(&text);
        }
        if config.strip_special_chars {
            text = stages::strip_special_chars(&text, config.remove_all_special_chars);
        }
        if config.spaces_sentence_end_markers() {
            text = stages::space_sentence_end_markers(&text);
        }
        if config.expands_contractions() {
            text = self.contractions.expand(&text);
        }
        text
    }

    /// Normalize many texts, in parallel for large batches. Order is preserved.
    pub fn normalize_batch<T: AsRef<str> + Sync>(&self, texts: &[T]) -> Vec<String> {
        debug!(num_texts = texts.len(), "Normalizing texts");
        parallel::map_texts(texts, |text| self.normalize(text))
    }
}
