use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::{PAD_ID, vocabulary::Vocabulary};

/// Side on which short sequences are padded.
///
/// Long sequences are truncated on the same side: `Post` keeps the first
/// tokens, `Pre` keeps the last ones.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaddingSide {
    Pre,
    #[default]
    Post,
}

impl fmt::Display for PaddingSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pre => write!(f, "pre"),
            Self::Post => write!(f, "post"),
        }
    }
}

impl FromStr for PaddingSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pre" => Ok(Self::Pre),
            "post" => Ok(Self::Post),
            other => Err(format!("unknown padding side '{other}', expected 'pre' or 'post'")),
        }
    }
}

/// Pad with [`PAD_ID`] or truncate `ids` to exactly `max_len` entries.
#[must_use]
pub fn pad_sequence(mut ids: Vec<u32>, max_len: usize, padding: PaddingSide) -> Vec<u32> {
    if ids.len() > max_len {
        match padding {
            PaddingSide::Post => ids.truncate(max_len),
            PaddingSide::Pre => {
                ids.drain(..ids.len() - max_len);
            }
        }
        return ids;
    }

    match padding {
        PaddingSide::Post => {
            ids.resize(max_len, PAD_ID);
            ids
        }
        PaddingSide::Pre => {
            let mut padded = vec![PAD_ID; max_len - ids.len()];
            padded.extend(ids);
            padded
        }
    }
}

/// A fixed-length id sequence ready for the model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedSequence {
    ids: Vec<u32>,
    oov_tokens: usize,
    truncated_tokens: usize,
}

impl EncodedSequence {
    /// Encode one text. Blank text becomes an all-padding sequence.
    #[must_use]
    pub fn encode(
        text: &str,
        max_len: usize,
        vocabulary: &Vocabulary,
        padding: PaddingSide,
    ) -> Self {
        let (ids, oov_tokens) = vocabulary.text_to_ids(text);
        let truncated_tokens = ids.len().saturating_sub(max_len);
        Self {
            ids: pad_sequence(ids, max_len, padding),
            oov_tokens,
            truncated_tokens,
        }
    }

    #[must_use]
    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    #[must_use]
    pub fn into_ids(self) -> Vec<u32> {
        self.ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Words that were not in the vocabulary (dropped or mapped to the OOV id).
    #[must_use]
    pub fn oov_tokens(&self) -> usize {
        self.oov_tokens
    }

    /// Ids cut off because the text was longer than the sequence length.
    #[must_use]
    pub fn truncated_tokens(&self) -> usize {
        self.truncated_tokens
    }

    /// Whether the sequence holds nothing but padding.
    #[must_use]
    pub fn is_all_padding(&self) -> bool {
        self.ids.iter().all(|&id| id == PAD_ID)
    }
}
