//! Citation key generation
//!
//! Keys look like `antin2008`, then `antin2008a`, `antin2008b` ... when the
//! plain key is taken. Generation is pure: the set of taken keys is passed
//! in, and the caller records the key it keeps.

use crate::types::{Document, JsonValue};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Keys already assigned (in the table or earlier in the same input)
pub type KnownIds = HashSet<String>;

/// Maximum number of characters kept from the name part
pub const NAME_MAX_LEN: usize = 15;

/// Suffixes stop before this many letters
pub const SUFFIX_LIMIT: usize = 10;

/// Characters dropped from names
static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W+").expect("valid regex"));

/// Suffix sequence: `a` … `z`, `aa` … `zz`, `aaa` …
#[derive(Debug, Clone)]
pub struct Suffixes {
    /// Letter indices of the next suffix, most significant first
    current: Vec<u8>,
    limit: usize,
}

impl Suffixes {
    /// Suffixes shorter than `limit` letters
    pub fn new(limit: usize) -> Self {
        Self {
            current: vec![0],
            limit,
        }
    }
}

impl Default for Suffixes {
    fn default() -> Self {
        Self::new(SUFFIX_LIMIT)
    }
}

impl Iterator for Suffixes {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.current.len() >= self.limit {
            return None;
        }

        let suffix = self.current.iter().map(|i| char::from(b'a' + i)).collect();

        // odometer increment; overflow grows the suffix by one letter
        let mut pos = self.current.len();
        loop {
            if pos == 0 {
                let len = self.current.len() + 1;
                self.current = vec![0; len];
                break;
            }
            pos -= 1;
            if self.current[pos] < 25 {
                self.current[pos] += 1;
                break;
            }
            self.current[pos] = 0;
        }

        Some(suffix)
    }
}

/// Text of a non-empty string value
fn non_empty_str(value: Option<&JsonValue>) -> Option<&str> {
    value.and_then(JsonValue::as_str).filter(|s| !s.is_empty())
}

/// Name the key is built from
///
/// The first person of the first non-empty `author`, `editor` or
/// `translator` list (`family`, then `literal`, then `given`); otherwise
/// `publisher`, `collection-title` or `title`.
pub fn citekey_name(entry: &Document) -> Option<&str> {
    let person = ["author", "editor", "translator"]
        .iter()
        .filter_map(|k| entry.get(*k).and_then(JsonValue::as_array))
        .find(|people| !people.is_empty())
        .and_then(|people| people.first());

    if let Some(person) = person {
        let name = ["family", "literal", "given"]
            .iter()
            .find_map(|k| person.get(*k).and_then(JsonValue::as_str));
        if let Some(name) = name {
            return Some(name);
        }
    }

    ["publisher", "collection-title", "title"]
        .iter()
        .find_map(|k| non_empty_str(entry.get(*k)))
}

/// Strip non-word characters, lowercase, truncate
pub fn format_name(name: &str) -> String {
    NON_WORD
        .replace_all(name, "")
        .to_lowercase()
        .chars()
        .take(NAME_MAX_LEN)
        .collect()
}

/// Year of `issued` (or `accessed`), empty when unknown
pub fn citekey_year(entry: &Document) -> String {
    ["issued", "accessed"]
        .iter()
        .find_map(|k| {
            let year = entry.get(*k)?.get("date-parts")?.get(0)?.get(0)?;
            Some(match year {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            })
        })
        .unwrap_or_default()
}

/// A key for `entry` that is not in `known`
///
/// `None` when the entry has nothing to derive a name from, or every
/// suffix is taken.
pub fn make_citekey(entry: &Document, known: &KnownIds) -> Option<String> {
    let name = citekey_name(entry).filter(|n| !n.is_empty())?;
    let base = format!("{}{}", format_name(name), citekey_year(entry));
    if !known.contains(&base) {
        return Some(base);
    }
    Suffixes::default()
        .map(|suffix| format!("{base}{suffix}"))
        .find(|key| !known.contains(key))
}
