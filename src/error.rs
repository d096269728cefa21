//! Error types for tagmerge operations.

use thiserror::Error;

/// Errors that can occur while merging, parsing, or rewriting documents.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid search pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("attribute '{attribute}' selected but no search value given")]
    MissingSearchValue { attribute: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Malformed markup: {0}")]
    Malformed(String),

    #[error("Invalid EPUB: {0}")]
    InvalidEpub(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub type Result<T> = std::result::Result<T, Error>;
