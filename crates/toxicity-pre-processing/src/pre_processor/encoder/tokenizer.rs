use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Characters replaced by the split string before splitting, as in the Keras
/// `Tokenizer` default.
pub const DEFAULT_FILTERS: &str = "!\"#$%&()*+,-./:;<=>?@[\\]^_`{|}~\t\n";

/// How text was split into words when the vocabulary was built.
///
/// Encoding must split exactly the same way, otherwise words that are in the
/// vocabulary are missed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
#[serde(default)]
pub struct TokenizerConfig {
    /// Every character in this string is replaced by `split`.
    pub filters: String,
    pub lower: bool,
    pub split: String,
    /// Treat every character (spaces included) as a token.
    pub char_level: bool,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            filters: DEFAULT_FILTERS.to_owned(),
            lower: true,
            split: " ".to_owned(),
            char_level: false,
        }
    }
}

impl TokenizerConfig {
    /// Split on single spaces only; no filtering, no case change.
    #[must_use]
    pub fn whitespace() -> Self {
        Self {
            filters: String::new(),
            lower: false,
            split: " ".to_owned(),
            char_level: false,
        }
    }

    /// Split `text` into the words looked up in the vocabulary.
    ///
    /// Empty words are dropped, so blank text yields no words.
    #[must_use]
    pub fn split_words(&self, text: &str) -> Vec<String> {
        let text = if self.lower {
            Cow::Owned(text.to_lowercase())
        } else {
            Cow::Borrowed(text)
        };

        if self.char_level {
            return text.chars().map(String::from).collect();
        }

        let translated = if self.filters.is_empty() {
            text
        } else {
            let mut out = String::with_capacity(text.len());
            for c in text.chars() {
                if self.filters.contains(c) {
                    out.push_str(&self.split);
                } else {
                    out.push(c);
                }
            }
            Cow::Owned(out)
        };

        if self.split.is_empty() {
            return translated.split_whitespace().map(String::from).collect();
        }
        translated
            .split(self.split.as_str())
            .filter(|word| !word.is_empty())
            .map(String::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filters_drop_punctuation() {
        let words = TokenizerConfig::default().split_words("hello world ! it is me . ");
        assert_eq!(words, vec!["hello", "world", "it", "is", "me"]);
    }

    #[test]
    fn default_filters_split_on_underscores() {
        let words = TokenizerConfig::default().split_words("big_grin");
        assert_eq!(words, vec!["big", "grin"]);
    }

    #[test]
    fn apostrophes_survive_default_filters() {
        let words = TokenizerConfig::default().split_words("You're");
        assert_eq!(words, vec!["you're"]);
    }

    #[test]
    fn whitespace_config_keeps_tokens_verbatim() {
        let words = TokenizerConfig::whitespace().split_words("Hi  ! there");
        assert_eq!(words, vec!["Hi", "!", "there"]);
    }

    #[test]
    fn blank_text_has_no_words() {
        assert!(TokenizerConfig::default().split_words("   ").is_empty());
        assert!(TokenizerConfig::default().split_words("").is_empty());
    }

    #[test]
    fn char_level_yields_characters() {
        let config = TokenizerConfig {
            char_level: true,
            ..TokenizerConfig::default()
        };
        assert_eq!(config.split_words("Ab c"), vec!["a", "b", " ", "c"]);
    }

    #[test]
    fn empty_split_falls_back_to_whitespace() {
        let config = TokenizerConfig {
            split: String::new(),
            ..TokenizerConfig::whitespace()
        };
        assert_eq!(config.split_words("a b\tc"), vec!["a", "b", "c"]);
    }
}
