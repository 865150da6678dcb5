use std::sync::{Arc, LazyLock};

use regex::Regex;

/// Contracted forms and their expansions, applied in this order.
///
/// Whole-word irregular forms come first; the generic suffix rules would
/// otherwise turn "won't" into "wo not".
const CONTRACTIONS: &[(&str, &str)] = &[
    (r"\bain't\b", "am not"),
    (r"\bwon't\b", "will not"),
    (r"\bshan't\b", "shall not"),
    (r"\bcan't\b", "can not"),
    (r"\blet's\b", "let us"),
    (r"\by'all\b", "you all"),
    (r"\bma'am\b", "madam"),
    (r"\bo'clock\b", "of the clock"),
    (r"n't\b", " not"),
    (r"'re\b", " are"),
    (r"'s\b", " is"),
    (r"'d\b", " would"),
    (r"'ll\b", " will"),
    (r"'t\b", " not"),
    (r"'ve\b", " have"),
    (r"'m\b", " am"),
];

static BUILTIN: LazyLock<Arc<ContractionTable>> = LazyLock::new(|| {
    Arc::new(
        ContractionTable::new(CONTRACTIONS.iter().copied())
            .expect("built-in contraction patterns are valid regular expressions"),
    )
});

/// Ordered pattern → expansion rules for undoing English contractions.
#[derive(Clone, Debug, Default)]
pub struct ContractionTable {
    rules: Vec<(Regex, String)>,
}

impl ContractionTable {
    /// The built-in table shared by every default normalizer.
    #[must_use]
    pub fn builtin() -> Arc<Self> {
        Arc::clone(&BUILTIN)
    }

    /// Compile a table from `(pattern, expansion)` pairs.
    ///
    /// Patterns are regular expressions matched against lowercased text.
    /// Expansions may refer to capture groups with `$name`.
    pub fn new<P, E>(entries: impl IntoIterator<Item = (P, E)>) -> Result<Self, regex::Error>
    where
        P: AsRef<str>,
        E: Into<String>,
    {
        let rules = entries
            .into_iter()
            .map(|(pattern, expansion)| Ok((Regex::new(pattern.as_ref())?, expansion.into())))
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { rules })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Expand every contraction, rule by rule in table order.
    ///
    /// The text is lowercased before each rule, so the output of a non-empty
    /// table is always lowercase.
    #[must_use]
    pub fn expand(&self, text: &str) -> String {
        let mut text = text.to_owned();
        for (pattern, expansion) in &self.rules {
            text = text.to_lowercase();
            text = pattern.replace_all(&text, expansion.as_str()).into_owned();
        }
        text
    }
}
