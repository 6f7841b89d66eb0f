//! Input decoding
//!
//! The input is a UTF-8 JSON document whose top level is an array of
//! objects, read from a file or from standard input. Decoding happens before
//! any store interaction, so a malformed input never touches the database.

use crate::error::{Error, Result};
use crate::types::{Document, JsonValue};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Where the input array comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// Standard input (`-` on the command line)
    Stdin,
    /// A file on disk
    File(PathBuf),
}

impl InputSource {
    /// Interpret a command-line argument (`-` means stdin)
    pub fn from_arg(arg: impl AsRef<Path>) -> Self {
        let arg = arg.as_ref();
        if arg == Path::new("-") {
            InputSource::Stdin
        } else {
            InputSource::File(arg.to_path_buf())
        }
    }

    /// Read the whole input as text
    pub fn read_to_string(&self) -> Result<String> {
        match self {
            InputSource::Stdin => {
                let mut body = String::new();
                std::io::stdin()
                    .read_to_string(&mut body)
                    .map_err(|e| Error::parse(format!("Failed to read stdin: {e}")))?;
                Ok(body)
            }
            InputSource::File(path) => {
                if !path.exists() {
                    return Err(Error::FileNotFound {
                        path: path.display().to_string(),
                    });
                }
                let bytes = std::fs::read(path)?;
                String::from_utf8(bytes).map_err(|e| {
                    Error::parse(format!("{} is not valid UTF-8: {e}", path.display()))
                })
            }
        }
    }

    /// Read and decode the documents
    pub fn read_documents(&self) -> Result<Vec<Document>> {
        decode_documents(&self.read_to_string()?)
    }
}

/// Decode a JSON array of objects
pub fn decode_documents(body: &str) -> Result<Vec<Document>> {
    let value: JsonValue = serde_json::from_str(body)
        .map_err(|e| Error::parse(format!("Failed to parse JSON: {e}")))?;
    documents_from_value(value)
}

/// Split an already parsed array into documents
pub fn documents_from_value(value: JsonValue) -> Result<Vec<Document>> {
    let JsonValue::Array(items) = value else {
        return Err(Error::parse("top-level value must be an array of objects"));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            JsonValue::Object(map) => Ok(map),
            other => Err(Error::parse(format!(
                "element {index} is {}, expected an object",
                crate::types::ValueKind::of(&other)
            ))),
        })
        .collect()
}
