use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for note operations
#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum NotesError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    QuickLink(#[from] QuickLinkError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("no note with id {id}")]
    #[diagnostic(code(notes::not_found))]
    NoteNotFound { id: String },
}

/// Key-value storage errors
#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum StorageError {
    #[error("failed to access storage file {}", path.display())]
    #[diagnostic(code(storage::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("storage file {} is not a JSON object", path.display())]
    #[diagnostic(
        code(storage::corrupt),
        help("fix or remove the file; it will be recreated")
    )]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode value for key {key}")]
    #[diagnostic(code(storage::encode))]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("stored value for key {key} has the wrong shape")]
    #[diagnostic(code(storage::decode))]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("storage lock poisoned")]
    #[diagnostic(code(storage::lock))]
    LockPoisoned,
}

/// Import validation errors. Nothing is written when one of these is
/// returned.
#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum ImportError {
    #[error("import data is not valid JSON")]
    #[diagnostic(code(import::syntax))]
    Syntax {
        #[source]
        source: serde_json::Error,
    },

    #[error("{}", invalid_fields_message(fields))]
    #[diagnostic(code(import::shape))]
    InvalidFields { fields: Vec<&'static str> },

    #[error("import data has the right shape but malformed entries")]
    #[diagnostic(code(import::decode))]
    Deserialize {
        #[source]
        source: serde_json::Error,
    },
}

/// `"notes, binNotes, not valid."`
pub(crate) fn invalid_fields_message(fields: &[&'static str]) -> String {
    let mut message = String::new();
    for field in fields {
        message.push_str(field);
        message.push_str(", ");
    }
    message.push_str("not valid.");
    message
}

/// Quick-link input errors
#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum QuickLinkError {
    #[error("{url:?} is not a valid URL")]
    #[diagnostic(
        code(quicklink::invalid_url),
        help("enter a full address such as https://example.com")
    )]
    InvalidUrl { url: String },

    #[error("a quick link to {url} already exists")]
    #[diagnostic(code(quicklink::duplicate))]
    Duplicate { url: String },

    #[error("no quick link with id {id}")]
    #[diagnostic(code(quicklink::not_found))]
    NotFound { id: String },
}

/// Configuration errors
#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{var}={value:?} is not a valid number")]
    #[diagnostic(code(config::invalid_env))]
    InvalidEnv { var: &'static str, value: String },
}
