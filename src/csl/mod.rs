//! CSL-JSON preprocessing
//!
//! Prepares a CSL-JSON bibliography for ingestion: drops ignored keys,
//! assigns a unique citation key to every entry's `id`, and replaces an
//! `annote` that names a file with that file's contents.
//!
//! Entries stay opaque documents afterwards; nothing downstream treats CSL
//! keys specially.

mod citekey;

pub use citekey::{
    citekey_name, citekey_year, format_name, make_citekey, KnownIds, Suffixes, NAME_MAX_LEN,
    SUFFIX_LIMIT,
};

use crate::error::{Result, ResultExt};
use crate::types::{Document, JsonValue};
use std::path::PathBuf;

/// Keys removed from every entry before ingestion
pub const IGNORED_KEYS: &[&str] = &["ID"];

/// Expand a leading `~` to the home directory
fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix('~'), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) if rest.is_empty() || rest.starts_with('/') => {
            let mut expanded = PathBuf::from(home);
            expanded.push(rest.trim_start_matches('/'));
            expanded
        }
        _ => PathBuf::from(path),
    }
}

/// If `annote` names an existing file, replace it with the file's contents
pub fn inline_annote(entry: &mut Document) -> Result<()> {
    let Some(JsonValue::String(annote)) = entry.get("annote") else {
        return Ok(());
    };

    let path = expand_home(annote.trim());
    if !path.is_file() {
        return Ok(());
    }

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read annote file {}", path.display()))?;
    tracing::debug!(path = %path.display(), "Inlined annote");
    entry.insert("annote".to_string(), JsonValue::String(contents));
    Ok(())
}

/// Prepare every entry and return the known ids, extended with the new keys
///
/// An entry without any name gets a JSON null `id`.
pub fn update_csl(entries: &mut [Document], mut known: KnownIds) -> Result<KnownIds> {
    for entry in entries.iter_mut() {
        for key in IGNORED_KEYS {
            entry.remove(*key);
        }

        let id = make_citekey(entry, &known);
        match &id {
            Some(id) => {
                known.insert(id.clone());
            }
            None => tracing::warn!("Entry has no name to build a citation key from"),
        }
        entry.insert("id".to_string(), id.map_or(JsonValue::Null, JsonValue::String));

        inline_annote(entry)?;
    }
    Ok(known)
}

/// Parse known ids, one per line, ignoring blank lines
pub fn parse_known_ids(text: &str) -> KnownIds {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
