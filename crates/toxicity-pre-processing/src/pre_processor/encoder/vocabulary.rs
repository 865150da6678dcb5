use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use ahash::HashMap;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{PAD_ID, tokenizer::TokenizerConfig};

/// Leading bytes of the binary encoding written by [`Vocabulary::to_bytes`].
const BINARY_MAGIC: &[u8; 8] = b"TXVOCAB1";

#[derive(Debug, Error)]
pub enum VocabularyError {
    #[error("failed to access vocabulary file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid vocabulary JSON")]
    Json(#[from] serde_json::Error),
    #[error("failed to decode binary vocabulary")]
    Decode(#[from] bincode::error::DecodeError),
    #[error("failed to encode binary vocabulary")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("unsupported vocabulary format: {0}")]
    Format(String),
}

/// Word → id mapping produced when the model was trained.
///
/// Besides the ids, the vocabulary carries the rules it was built with: how
/// text is split into words ([`TokenizerConfig`]), an optional cap on usable
/// ids (`num_words`) and an optional out-of-vocabulary token. Unknown words
/// map to the OOV token's id when it exists and are dropped otherwise.
///
/// The vocabulary must be the one the model was trained with. Nothing checks
/// this; a mismatched pair silently produces meaningless scores.
#[derive(Clone, Debug, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Vocabulary {
    word_index: HashMap<String, u32>,
    tokenizer: TokenizerConfig,
    num_words: Option<u32>,
    oov_token: Option<String>,
}

/// Shape of a Keras `Tokenizer.to_json()` export
#[derive(Deserialize)]
struct KerasTokenizerJson {
    config: KerasTokenizerConfig,
}

#[derive(Deserialize)]
struct KerasTokenizerConfig {
    #[serde(flatten)]
    tokenizer: TokenizerConfig,
    #[serde(default)]
    num_words: Option<u32>,
    #[serde(default)]
    oov_token: Option<String>,
    /// Keras stores the index as a JSON document inside a string
    word_index: serde_json::Value,
}

impl Vocabulary {
    /// Build a vocabulary from `(word, id)` pairs with the default Keras
    /// splitting rules, no id cap and no OOV token.
    pub fn from_word_index<K: Into<String>>(entries: impl IntoIterator<Item = (K, u32)>) -> Self {
        Self {
            word_index: entries
                .into_iter()
                .map(|(word, id)| (word.into(), id))
                .collect(),
            tokenizer: TokenizerConfig::default(),
            num_words: None,
            oov_token: None,
        }
    }

    #[must_use]
    pub fn with_tokenizer(mut self, tokenizer: TokenizerConfig) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Only ids below `num_words` are used; higher ones count as unknown.
    /// `0` means no cap.
    #[must_use]
    pub fn with_num_words(mut self, num_words: u32) -> Self {
        self.num_words = (num_words > 0).then_some(num_words);
        self
    }

    #[must_use]
    pub fn with_oov_token(mut self, token: impl Into<String>) -> Self {
        self.oov_token = Some(token.into());
        self
    }

    /// Parse either a Keras tokenizer export or a plain `{"word": id}` object.
    pub fn from_json_str(json: &str) -> Result<Self, VocabularyError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let is_keras_export = value
            .get("config")
            .is_some_and(|config| config.get("word_index").is_some());

        let vocabulary = if is_keras_export {
            let export: KerasTokenizerJson = serde_json::from_value(value)?;
            let config = export.config;
            let word_index = match config.word_index {
                serde_json::Value::String(embedded) => serde_json::from_str(&embedded)?,
                other => serde_json::from_value(other)?,
            };
            Self {
                word_index,
                tokenizer: config.tokenizer,
                num_words: config.num_words.filter(|&n| n > 0),
                oov_token: config.oov_token,
            }
        } else if value.is_object() {
            Self {
                word_index: serde_json::from_value(value)?,
                ..Self::from_word_index(std::iter::empty::<(String, u32)>())
            }
        } else {
            return Err(VocabularyError::Format(
                "expected a JSON object mapping words to ids".to_owned(),
            ));
        };

        vocabulary.check();
        Ok(vocabulary)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VocabularyError> {
        let payload = bytes.strip_prefix(BINARY_MAGIC.as_slice()).ok_or_else(|| {
            VocabularyError::Format("missing binary vocabulary header".to_owned())
        })?;
        let (vocabulary, _): (Self, usize) =
            bincode::decode_from_slice(payload, bincode::config::standard())?;
        vocabulary.check();
        Ok(vocabulary)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, VocabularyError> {
        let payload = bincode::encode_to_vec(self, bincode::config::standard())?;
        let mut bytes = Vec::with_capacity(BINARY_MAGIC.len() + payload.len());
        bytes.extend_from_slice(BINARY_MAGIC);
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    /// Load a vocabulary artifact, detecting JSON or binary encoding.
    ///
    /// A `.json` extension always means JSON. Otherwise the binary header
    /// decides, and headerless files starting with `{` are read as JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, VocabularyError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| VocabularyError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        // Extension first, then the binary header, then a leading `{`
        let looks_like_json = match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => true,
            _ if bytes.starts_with(BINARY_MAGIC) => false,
            _ => bytes.iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'{'),
        };

        let vocabulary = if looks_like_json {
            let json = std::str::from_utf8(&bytes)
                .map_err(|e| VocabularyError::Format(format!("vocabulary is not UTF-8: {e}")))?;
            Self::from_json_str(json)?
        } else {
            Self::from_bytes(&bytes)?
        };

        info!(
            path = %path.display(),
            vocab_size = vocabulary.len(),
            num_words = ?vocabulary.num_words,
            oov_token = ?vocabulary.oov_token,
            "Loaded vocabulary"
        );
        Ok(vocabulary)
    }

    /// Write the binary encoding to `path`, replacing any existing file atomically.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), VocabularyError> {
        let path = path.as_ref();
        let io_error = |source| VocabularyError::Io {
            path: path.to_path_buf(),
            source,
        };
        let parent_dir = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent_dir).map_err(io_error)?;

        let bytes = self.to_bytes()?;
        let mut temp_file = NamedTempFile::new_in(parent_dir).map_err(io_error)?;
        temp_file.write_all(&bytes).map_err(io_error)?;
        temp_file.persist(path).map_err(|e| io_error(e.error))?;
        debug!(path = %path.display(), bytes = bytes.len(), "Saved vocabulary");
        Ok(())
    }

    /// Log inconsistencies that make encoding lossy.
    fn check(&self) {
        if let Some(token) = &self.oov_token {
            if !self.word_index.contains_key(token) {
                warn!(
                    oov_token = %token,
                    "OOV token is not in the word index, unknown words will be dropped"
                );
            }
        }
        if self.word_index.values().any(|&id| id == PAD_ID) {
            warn!("Word index assigns the padding id to a word");
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.word_index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.word_index.is_empty()
    }

    #[must_use]
    pub fn tokenizer(&self) -> &TokenizerConfig {
        &self.tokenizer
    }

    #[must_use]
    pub fn num_words(&self) -> Option<u32> {
        self.num_words
    }

    #[must_use]
    pub fn oov_token(&self) -> Option<&str> {
        self.oov_token.as_deref()
    }

    /// Id that unknown words map to, if the vocabulary has one.
    #[must_use]
    pub fn oov_id(&self) -> Option<u32> {
        self.oov_token
            .as_ref()
            .and_then(|token| self.word_index.get(token).copied())
    }

    /// Raw id of `word`, ignoring the `num_words` cap and the OOV policy.
    #[must_use]
    pub fn id(&self, word: &str) -> Option<u32> {
        self.word_index.get(word).copied()
    }

    /// Id used for `word` when encoding, or `None` when it is dropped.
    #[must_use]
    pub fn lookup(&self, word: &str) -> Option<u32> {
        match self.word_index.get(word) {
            Some(&id) if self.num_words.is_some_and(|limit| id >= limit) => self.oov_id(),
            Some(&id) => Some(id),
            None => self.oov_id(),
        }
    }

    /// Ids for the words of `text`, plus how many of those words were unknown.
    ///
    /// Unknown words are either replaced with the OOV id or left out.
    #[must_use]
    pub fn text_to_ids(&self, text: &str) -> (Vec<u32>, usize) {
        let words = self.tokenizer.split_words(text);
        let mut ids = Vec::with_capacity(words.len());
        let mut unknown = 0;
        for word in &words {
            let known = self
                .word_index
                .get(word.as_str())
                .is_some_and(|&id| self.num_words.is_none_or(|limit| id < limit));
            if !known {
                unknown += 1;
            }
            if let Some(id) = self.lookup(word) {
                ids.push(id);
            }
        }
        (ids, unknown)
    }
}
