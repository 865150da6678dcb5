//! The individual normalization stages.
//!
//! Every stage is a pure `&str -> String` function. [`TextNormalizer`](super::TextNormalizer)
//! chains them in a fixed order; they are public so callers can run a single
//! stage in isolation.

use std::{borrow::Cow, sync::LazyLock};

use deunicode::deunicode_with_tofu;
use regex::Regex;
use scraper::{Html, Node};

static IPV4_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"((25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)",
    )
    .expect("valid IPv4 pattern")
});

static HYPERLINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\b((?:https?://|www\d{0,3}[.]|[a-z0-9.\-]+[.][a-z]{2,4}/)(?:[^\s()<>]+|\(([^\s()<>]+|(\([^\s()<>]+\)))*\))+(?:\(([^\s()<>]+|(\([^\s()<>]+\)))*\)|[^\s`!()\[\]{};:'".,<>?«»“”‘’]))"#,
    )
    .expect("valid hyperlink pattern")
});

static EXCLAMATION_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!+ *!*").expect("valid exclamation pattern"));
static QUESTION_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\?+ *\?*").expect("valid question pattern"));
static PERIOD_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.+ *\.*").expect("valid period pattern"));

/// Collapse every run of two or more ASCII spaces into one.
///
/// Only the space character is touched; tabs and newlines are kept.
#[must_use]
pub fn collapse_spaces(text: &str) -> Cow<'_, str> {
    if !text.contains("  ") {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut prev_space = false;
    for c in text.chars() {
        if c == ' ' {
            if !prev_space {
                out.push(' ');
            }
            prev_space = true;
        } else {
            out.push(c);
            prev_space = false;
        }
    }
    Cow::Owned(out)
}

/// Parse `text` as HTML and keep only its visible text.
///
/// `<script>` and `<style>` elements are dropped together with their
/// content. Each remaining text node is trimmed, empty ones are skipped and
/// the rest are joined with single spaces. Entities are decoded by the parser.
#[must_use]
pub fn strip_html(text: &str) -> String {
    let document = Html::parse_fragment(text);
    document
        .tree
        .root()
        .descendants()
        .filter(|node| {
            !node.ancestors().any(|ancestor| match ancestor.value() {
                Node::Element(element) => matches!(element.name(), "script" | "style"),
                _ => false,
            })
        })
        .filter_map(|node| match node.value() {
            Node::Text(fragment) => Some(fragment.trim()),
            _ => None,
        })
        .filter(|fragment| !fragment.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Transliterate `text` to ASCII.
///
/// Accented letters lose their marks ("café" becomes "cafe") and other
/// scripts are romanized ("привет" becomes "privet"). Characters with no
/// transliteration are removed.
#[must_use]
pub fn fold_accents(text: &str) -> String {
    if text.is_ascii() {
        return text.to_owned();
    }
    deunicode_with_tofu(text, "")
}

/// Full Unicode lowercasing.
#[must_use]
pub fn lowercase(text: &str) -> String {
    text.to_lowercase()
}

/// Remove IPv4 addresses, hyperlinks and digits, then collapse spaces.
///
/// Each removal is independently switchable; spaces are collapsed even when
/// all three are off.
#[must_use]
pub fn strip_ip_links_numbers(
    text: &str,
    ip_addresses: bool,
    hyperlinks: bool,
    numbers: bool,
) -> String {
    let mut text = Cow::Borrowed(text);
    if ip_addresses {
        text = Cow::Owned(IPV4_ADDRESS.replace_all(&text, "").into_owned());
    }
    if hyperlinks {
        text = Cow::Owned(HYPERLINK.replace_all(&text, "").into_owned());
    }
    if numbers && text.bytes().any(|b| b.is_ascii_digit()) {
        text = Cow::Owned(text.chars().filter(|c| !c.is_ascii_digit()).collect());
    }
    collapse_spaces(&text).into_owned()
}

/// Drop everything that is not an ASCII letter or a space.
///
/// Unless `remove_all` is set, the sentence punctuation `' . ? !` is kept too.
#[must_use]
pub fn strip_special_chars(text: &str, remove_all: bool) -> String {
    let keep = |c: &char| {
        c.is_ascii_alphabetic() || *c == ' ' || (!remove_all && matches!(c, '\'' | '.' | '?' | '!'))
    };
    let filtered = text.chars().filter(keep).collect::<String>();
    collapse_spaces(&filtered).into_owned()
}

/// Turn each run of `!`, `?` and `.` into a single space-padded marker.
///
/// Runs may be interrupted by spaces (`"! !"` is one run). Exclamation marks
/// are handled first, then question marks, then periods.
#[must_use]
pub fn space_sentence_end_markers(text: &str) -> String {
    let text = EXCLAMATION_RUN.replace_all(text, " ! ");
    let text = QUESTION_RUN.replace_all(&text, " ? ");
    let text = PERIOD_RUN.replace_all(&text, " . ");
    collapse_spaces(&text).into_owned()
}
