use serde::{Deserialize, Serialize};

/// Switches for each normalization stage.
///
/// The default matches the pre-processing the classifier was trained with:
/// every stage on, hyperlinks kept, sentence punctuation kept and BERT mode off.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationConfig {
    /// Parse as HTML and keep only visible text.
    pub strip_html: bool,
    /// Transliterate accented and other non-ASCII characters to ASCII.
    pub fold_accents: bool,
    pub lowercase: bool,
    /// Gate for the IP address / hyperlink / number stage. The three flags
    /// below only matter when this is on.
    pub strip_ip_link_numbers: bool,
    pub strip_ip_addresses: bool,
    pub strip_hyperlinks: bool,
    pub strip_numbers: bool,
    /// Replace emoticons such as `:-)` with words.
    pub substitute_emoticons: bool,
    pub strip_special_chars: bool,
    /// When stripping special characters, also drop `' . ? !`.
    pub remove_all_special_chars: bool,
    /// Space-pad runs of `!`, `?` and `.` into single markers.
    pub normalize_sentence_end_markers: bool,
    pub expand_contractions: bool,
    /// Pre-processing for BERT-style models. Overrides
    /// `normalize_sentence_end_markers` and `expand_contractions` to off.
    pub bert_mode: bool,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            strip_html: true,
            fold_accents: true,
            lowercase: true,
            strip_ip_link_numbers: true,
            strip_ip_addresses: true,
            strip_hyperlinks: false,
            strip_numbers: true,
            substitute_emoticons: true,
            strip_special_chars: true,
            remove_all_special_chars: false,
            normalize_sentence_end_markers: true,
            expand_contractions: true,
            bert_mode: false,
        }
    }
}

impl NormalizationConfig {
    /// Every stage switched off; normalization becomes the identity.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            strip_html: false,
            fold_accents: false,
            lowercase: false,
            strip_ip_link_numbers: false,
            strip_ip_addresses: false,
            strip_hyperlinks: false,
            strip_numbers: false,
            substitute_emoticons: false,
            strip_special_chars: false,
            remove_all_special_chars: false,
            normalize_sentence_end_markers: false,
            expand_contractions: false,
            bert_mode: false,
        }
    }

    /// The default stages with BERT mode switched on.
    #[must_use]
    pub fn bert() -> Self {
        Self {
            bert_mode: true,
            ..Self::default()
        }
    }

    /// Whether the sentence-end-marker stage actually runs.
    #[must_use]
    pub fn spaces_sentence_end_markers(&self) -> bool {
        self.normalize_sentence_end_markers && !self.bert_mode
    }

    /// Whether the contraction stage actually runs.
    #[must_use]
    pub fn expands_contractions(&self) -> bool {
        self.expand_contractions && !self.bert_mode
    }
}
