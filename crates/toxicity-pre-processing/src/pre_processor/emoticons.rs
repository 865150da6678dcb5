use std::sync::{Arc, LazyLock};

use ahash::HashMap;

use super::normalizer::stages::collapse_spaces;

/// Emoticon glyphs and their meaning, in substitution order.
///
/// A few glyphs are listed twice. The later meaning wins while the glyph keeps
/// the position of its first appearance, so `:-(` is substituted early but
/// reads as "sad".
#[rustfmt::skip]
const EMOTICONS: &[(&str, &str)] = &[
    ("(.V.)", "alien"), ("O:-)", "angel"), ("X-(", "angry"), ("~:0", "baby"),
    (":-D", "big grin"), (":-#", "braces"), ("=^.^=", "cat"), ("*<:o)", "clown"),
    ("O.o", "confused"), ("B-)", "cool"), (":_(", "crying"), (r"\:D/", "dancing"),
    ("*-*", "dazed"), (":o3", "dog"), ("#-o", "doh"), (":*)", "drunk"),
    ("//_^", "emo"), (">:)", "evil grin"), ("<><", "fish"), (":(", "frown"),
    (":-(", "frown"), (":-(", "frowning"), ("=P", "frustrated"), (":-P", "frustrated"),
    ("8-)", "glasses"), ("$_$", "greedy"), (":->", "grin"), (":-)", "happy"),
    (":)", "happy"), ("=)", "happy"), ("#", "hashtag"), ("<3", "heart"),
    ("{}", "hug"), (":-|", "indifferent"), ("X-p", "joking"), (":*", "kiss"),
    (":-*", "kiss"), (":-)*", "kiss"), ("(-}{-)", "kissing"), ("XD", "laughing"),
    ("=D", "laughing out loud"), (")-:", "left-handed sad face"),
    ("(-:", "Left-handed smiley face"), ("<3", "love"), ("=/", "mad"),
    (":-)(-:", "married"), ("@", "mention"), ("<:3)~", "mouse"), ("~,~", "napping"),
    (":-B", "nerd"), ("^_^", "overjoyed"), ("<l:0", "partying"), (":-/", "perplexed"),
    ("=8)", "Pig"), ("@~)~~~~", "rose"), (":-(", "sad"), (":(", "sad"),
    ("=(", "sad"), (":S", "sarcastic"), (":-@", "screaming"), ("=O", "shocked"),
    (":-o", "shocked"), (":-Q", "smoking"), (":>", "smug"), (":P", "sticking tongue out"),
    (":o", "surprised"), (":-J", "tongue in cheek"), (":-&", "tongue tied"),
    ("=-O", "uh-oh"), (":-E", "vampire"), ("=D", "very happy"), (";-)", "winking"),
    (";)", "winking"), ("|-O", "yawn"), ("8-#", "zombie"),
];

static BUILTIN: LazyLock<Arc<EmoticonTable>> =
    LazyLock::new(|| Arc::new(EmoticonTable::from_entries(EMOTICONS.iter().copied())));

/// Ordered glyph → word substitution table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EmoticonTable {
    /// (glyph, replacement) where the replacement is already `_`-joined and space padded
    entries: Vec<(String, String)>,
}

impl EmoticonTable {
    /// The built-in table shared by every default normalizer.
    #[must_use]
    pub fn builtin() -> Arc<Self> {
        Arc::clone(&BUILTIN)
    }

    /// Build a table from `(glyph, phrase)` pairs.
    ///
    /// Multi-word phrases are joined with `_` so that they survive as a single
    /// word. A repeated glyph overwrites the phrase of its first entry without
    /// moving it.
    pub fn from_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut positions = HashMap::<String, usize>::default();
        let mut table: Vec<(String, String)> = Vec::new();

        for (glyph, phrase) in entries {
            let glyph = glyph.into();
            if glyph.is_empty() {
                continue;
            }
            let replacement = format!(
                " {} ",
                phrase.as_ref().split_whitespace().collect::<Vec<_>>().join("_")
            );
            match positions.get(&glyph) {
                Some(&idx) => table[idx].1 = replacement,
                None => {
                    positions.insert(glyph.clone(), table.len());
                    table.push((glyph, replacement));
                }
            }
        }

        Self { entries: table }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The word a glyph is replaced with, without the padding spaces.
    #[must_use]
    pub fn word_for(&self, glyph: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(g, _)| g == glyph)
            .map(|(_, replacement)| replacement.trim())
    }

    /// Glyphs in substitution order.
    pub fn glyphs(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(glyph, _)| glyph.as_str())
    }

    /// Replace every glyph with its word, one glyph at a time in table order.
    ///
    /// Runs of spaces are collapsed after each glyph. A glyph consumed by an
    /// earlier substitution is no longer visible to later ones.
    #[must_use]
    pub fn expand(&self, text: &str) -> String {
        let mut text = text.to_owned();
        for (glyph, replacement) in &self.entries {
            if text.contains(glyph.as_str()) {
                text = text.replace(glyph.as_str(), replacement);
            }
            if text.contains("  ") {
                text = collapse_spaces(&text).into_owned();
            }
        }
        text
    }
}
