//! Error taxonomy for the indexing-and-query pipeline.
//!
//! Recoverable errors (everything except a handful of store-level
//! invariants) are logged and carried as structured diagnostics in an
//! operation's result rather than aborting the caller.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MillerError {
    #[error("unsupported language for {path:?}")]
    UnsupportedLanguage { path: PathBuf },

    #[error("parse error in {path:?}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("extractor error on node {node_type} in {path:?}: {message}")]
    ExtractorError {
        path: PathBuf,
        node_type: String,
        message: String,
    },

    #[error("store error: {0}")]
    StoreError(#[from] rusqlite::Error),

    #[error("vector store error: {0}")]
    VectorStoreError(String),

    #[error("embedder unavailable: {0}")]
    EmbedderUnavailable(String),

    #[error("file {path:?} was modified externally during the operation")]
    ConcurrencyConflict { path: PathBuf },

    #[error("operation cancelled")]
    Cancelled,

    #[error("permission denied: {path:?}")]
    PermissionDenied { path: PathBuf },

    #[error("io error on {path:?}: {source}")]
    IOError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, MillerError>;

/// A recoverable, file- or node-scoped warning surfaced alongside a
/// best-effort result rather than failing the whole operation.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Diagnostic {
    pub path: Option<PathBuf>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            path: None,
            message: message.into(),
        }
    }

    pub fn for_path(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            message: message.into(),
        }
    }
}

impl From<&MillerError> for Diagnostic {
    fn from(err: &MillerError) -> Self {
        Diagnostic::new(err.to_string())
    }
}
