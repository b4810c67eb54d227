//! Body text handling applied before anything reaches a store: sentinel normalization
//! and the acceptance policy.

/// Removed-by-moderator marker.
pub const REMOVED_MARKER: &str = "[removed]";
/// Deleted-by-author marker.
pub const DELETED_MARKER: &str = "[deleted]";

/// Fold control characters into sentinel tokens and double quotes into single quotes:
/// `\n` -> `<NL>`, `\r` -> `<CR>`, `"` -> `'`, `\t` -> `<TAB>`.
///
/// Sentinels contain none of the folded characters, so the output is a fixed point.
pub fn normalize_body(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for ch in text.chars() {
        match ch {
            '\n' => out.push_str("<NL>"),
            '\r' => out.push_str("<CR>"),
            '"' => out.push('\''),
            '\t' => out.push_str("<TAB>"),
            c => out.push(c),
        }
    }
    out
}

/// Length and content gate for normalized bodies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AcceptancePolicy {
    /// Maximum number of single-space separated tokens.
    pub max_words: usize,
    /// Maximum length in chars (Unicode scalar values).
    pub max_chars: usize,
}

impl Default for AcceptancePolicy {
    fn default() -> Self {
        Self { max_words: 50, max_chars: 1000 }
    }
}

impl AcceptancePolicy {
    /// `text` must already be normalized.
    pub fn accepts(&self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        // Single-space split, not whitespace runs: "a  b" counts 3 tokens.
        if text.split(' ').count() > self.max_words {
            return false;
        }
        if text.chars().count() > self.max_chars {
            return false;
        }
        text != REMOVED_MARKER && text != DELETED_MARKER
    }
}
