//! Character sets and ignore-index synthesis (spec §4.H step 2).
//!
//! The recognizer's charset is a flat, ordered list of characters whose
//! position corresponds to a model class index (offset by the blank
//! index, see [`crate::ctc`]). Options-level filtering narrows which
//! classes are eligible to be emitted, expressed as a set of ignored
//! indices rather than a rewritten charset.

use std::collections::HashSet;

use crate::options::CharsetFilter;

/// Punctuation/symbol characters always available unless narrowed by an
/// allowlist (spec §4.H step 2 default symbol set, digits listed
/// separately since they are spelled as a "0-9" range marker).
pub const DEFAULT_SYMBOLS: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~ ";

/// Per-language character sets. Only `"en"` is populated in this build;
/// other codes fall back to the default symbol set plus digits/letters,
/// matching the reference's "language-agnostic core + script extras"
/// structure without bundling every script's character table.
pub fn language_charset(lang: &str) -> String {
    match lang {
        "en" => {
            let mut s = String::new();
            s.push_str("0123456789");
            s.push_str("abcdefghijklmnopqrstuvwxyz");
            s.push_str("ABCDEFGHIJKLMNOPQRSTUVWXYZ");
            s
        }
        _ => String::new(),
    }
}

/// The charset actually used to build a model's class indices: an
/// ordered, deduplicated list of characters, loaded from a charset file
/// (spec §6) or falling back to [`default_charset`] when none is given.
#[derive(Debug, Clone, PartialEq)]
pub struct Charset {
    pub chars: Vec<char>,
}

impl Charset {
    pub fn from_chars(chars: Vec<char>) -> Self {
        Self { chars }
    }

    /// Parses a charset file's contents: one character per codepoint
    /// slot, trailing newline tolerated (spec §6).
    pub fn parse(contents: &str) -> Self {
        let trimmed = contents.trim_end_matches(['\n', '\r']);
        Self {
            chars: trimmed.chars().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }
}

/// A default English charset, used when no charset file accompanies the
/// recognizer. Built from digits, the default symbol set, and upper/
/// lower-case letters (95 characters). The reference's English model
/// charset file is documented as 96 characters (spec §6); the exact
/// 96th character could not be recovered from the available material —
/// recorded as an open question in DESIGN.md rather than guessed.
pub fn default_charset() -> Charset {
    let mut chars: Vec<char> = Vec::new();
    for c in "0123456789".chars() {
        chars.push(c);
    }
    for c in DEFAULT_SYMBOLS.chars() {
        chars.push(c);
    }
    for c in "abcdefghijklmnopqrstuvwxyz".chars() {
        chars.push(c);
    }
    for c in "ABCDEFGHIJKLMNOPQRSTUVWXYZ".chars() {
        chars.push(c);
    }
    Charset::from_chars(chars)
}

/// Translates a set of charset-relative indices (0-based into
/// `charset.chars`) into model class indices, accounting for the blank
/// offset (spec §4.G character-mapping convention).
fn charset_index_to_class_index(charset_index: usize, blank: usize) -> usize {
    if charset_index < blank {
        charset_index
    } else {
        charset_index + 1
    }
}

/// Synthesizes the set of ignored model class indices from, in priority
/// order: allowlist, blocklist, langList (spec §4.H step 2).
pub fn synthesize_ignore_indices(
    charset: &Charset,
    filter: &CharsetFilter,
    blank: usize,
) -> HashSet<usize> {
    let mut ignore = HashSet::new();

    if let Some(allow) = &filter.allowlist {
        let allowed: HashSet<char> = allow.chars().collect();
        for (i, c) in charset.chars.iter().enumerate() {
            if !allowed.contains(c) {
                ignore.insert(charset_index_to_class_index(i, blank));
            }
        }
        return ignore;
    }

    if let Some(block) = &filter.blocklist {
        let blocked: HashSet<char> = block.chars().collect();
        for (i, c) in charset.chars.iter().enumerate() {
            if blocked.contains(c) {
                ignore.insert(charset_index_to_class_index(i, blank));
            }
        }
        return ignore;
    }

    if !filter.lang_list.is_empty() {
        let mut allowed: HashSet<char> = DEFAULT_SYMBOLS.chars().collect();
        allowed.extend("0123456789".chars());
        for lang in &filter.lang_list {
            allowed.extend(language_charset(lang).chars());
        }
        for (i, c) in charset.chars.iter().enumerate() {
            if !allowed.contains(c) {
                ignore.insert(charset_index_to_class_index(i, blank));
            }
        }
    }

    ignore
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_charset_has_no_duplicates_from_digit_overlap() {
        let cs = default_charset();
        let unique: HashSet<char> = cs.chars.iter().copied().collect();
        assert_eq!(unique.len(), cs.chars.len());
    }

    #[test]
    fn allowlist_ignores_everything_else() {
        let charset = Charset::from_chars(vec!['a', 'b', 'c']);
        let filter = CharsetFilter {
            allowlist: Some("a".to_string()),
            ..Default::default()
        };
        let ignore = synthesize_ignore_indices(&charset, &filter, 0);
        // blank=0 shifts charset index i -> class index i+1.
        assert!(ignore.contains(&2)); // 'b' -> charset idx 1 -> class 2
        assert!(ignore.contains(&3)); // 'c' -> charset idx 2 -> class 3
        assert!(!ignore.contains(&1)); // 'a' stays allowed
    }

    #[test]
    fn blocklist_ignores_named_chars_only() {
        let charset = Charset::from_chars(vec!['a', 'b', 'c']);
        let filter = CharsetFilter {
            blocklist: Some("b".to_string()),
            ..Default::default()
        };
        let ignore = synthesize_ignore_indices(&charset, &filter, 0);
        assert_eq!(ignore, HashSet::from([2]));
    }

    #[test]
    fn parse_trims_trailing_newline() {
        let cs = Charset::parse("abc\n");
        assert_eq!(cs.chars, vec!['a', 'b', 'c']);
    }
}
