//! Normalization of noisy release descriptions.
//!
//! Bookmark titles, video titles and tracker listings all carry noise around
//! the artist and album names: site names, "(Full Album)", years, disc
//! numbers, format words. [`normalize`] strips that noise so two descriptions
//! of the same release compare well.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// Parenthesized, braced and bracketed comments.
static COMMENTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([^)]*\)|\{[^}]*\}|\[[^\]]*\]").unwrap());

/// Noise vocabulary, applied in order. Longer phrases come before the words
/// they contain.
const NOISE_PATTERNS: &[&str] = &[
    "youtube",
    "rdio",
    "grooveshark",
    "- profile -",
    "from the album",
    "full album",
    "album",
    "debut",
    "self-titled",
    "self titled",
    "hd",
    "narrated",
    "composed",
    "by",
    r"feat\.",
    "feat",
    "ft",
    r"vs\.",
    "vs",
    "track [a-z]?[0-9]*",
    "track",
    "volume [a-z]?[0-9]*",
    "volume",
    r"vol\. ?[0-9]+",
    "disc [a-z]?[0-9]*",
    "disc",
    "cd [a-z]?[0-9]*",
    "cd",
    "vinyl",
    "lp",
    "ep",
    "18[8-9][0-9]",
    "19[0-9][0-9]",
    "2[0-9][0-9][0-9]",
];

static NOISE: Lazy<Vec<Regex>> = Lazy::new(|| {
    NOISE_PATTERNS
        .iter()
        .map(|pattern| Regex::new(pattern).unwrap())
        .collect()
});

/// Normalize a free-text description into a comparison key.
///
/// Lower-cases, removes `(...)`, `{...}` and `[...]` comments, removes noise
/// words that stand alone between non-word characters, drops tokens made only
/// of punctuation, and collapses whitespace. Total and idempotent.
///
/// Removing one noise word can bring the words of a noise phrase together
/// (`"self 1999 titled"`), so passes repeat until the text stops changing.
pub fn normalize(text: &str) -> String {
    let mut current = normalize_pass(text);
    loop {
        let next = normalize_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// One pass over the text. Never lengthens already-normalized text.
fn normalize_pass(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut current = collapse(&COMMENTS.replace_all(&lowered, ""));

    for pattern in NOISE.iter() {
        current = strip_bounded(&current, pattern);
    }

    collapse(&current)
}

/// Single-space join of the tokens holding at least one alphanumeric.
fn collapse(text: &str) -> String {
    text.split_whitespace()
        .filter(|token| token.chars().any(char::is_alphanumeric))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Remove every match of `pattern` that is delimited by non-word characters
/// or the string edges. Matches glued to a word character are kept.
fn strip_bounded(text: &str, pattern: &Regex) -> String {
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut pos = 0;

    while pos < text.len() {
        let Some(m) = pattern.find_at(text, pos) else {
            break;
        };

        if m.start() < m.end() && is_bounded(text, m.start(), m.end()) {
            out.push_str(&text[copied..m.start()]);
            copied = m.end();
            pos = m.end();
        } else {
            pos = next_char_boundary(text, m.start());
        }
    }

    out.push_str(&text[copied..]);
    out
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_bounded(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back().map_or(true, |c| !is_word_char(c));
    let after = text[end..].chars().next().map_or(true, |c| !is_word_char(c));
    before && after
}

fn next_char_boundary(text: &str, pos: usize) -> usize {
    pos + text[pos..].chars().next().map_or(1, char::len_utf8)
}

/// Ordered, normalized keywords for one query.
///
/// Tokens are never empty and have already been through [`normalize`], so a
/// `SearchKey` is always safe to compare against other normalized text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchKey {
    tokens: Vec<String>,
}

impl SearchKey {
    /// Build a key from a raw description, one token per word.
    pub fn from_description(description: &str) -> Self {
        Self {
            tokens: normalize(description)
                .split(' ')
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect(),
        }
    }

    /// Build a key from already-separated keywords (e.g. artist and album).
    ///
    /// Each keyword is normalized on its own; keywords that normalize to
    /// nothing are dropped.
    pub fn from_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            tokens: keywords
                .into_iter()
                .map(|k| normalize(k.as_ref()))
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// All tokens joined by single spaces.
    pub fn joined(&self) -> String {
        self.tokens.join(" ")
    }
}
