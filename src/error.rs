//! Error taxonomy for the acquisition pipeline.
//!
//! Every failure a caller can react to differently gets its own variant:
//! an unsupported URL is a capability boundary, a parse failure may warrant
//! a rendered refetch, a missing PDF degrades the save instead of failing
//! it, and an unreachable manager is an environment problem to surface
//! verbatim.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// How much of a failing payload is kept for diagnostics.
const SNIPPET_LEN: usize = 200;

#[derive(Debug, Error)]
pub enum Error {
    /// The URL does not belong to any supported repository.
    #[error("unsupported source: {0}")]
    UnsupportedSource(String),

    /// A network-level failure: connect, timeout, non-success status.
    #[error("network error: {0}")]
    Network(String),

    /// The payload came back but did not contain what the extractor
    /// expected. Carries a snippet of the offending payload.
    #[error("parse error from {source_id}: {detail}")]
    Parse {
        source_id: String,
        detail: String,
        snippet: String,
    },

    /// Every PDF candidate was exhausted. Callers degrade to a link
    /// attachment rather than failing the save.
    #[error("no PDF could be downloaded from any candidate")]
    AttachmentUnavailable,

    /// The local reference manager did not answer.
    #[error("reference manager unreachable at {endpoint}: {detail} (is Zotero running? start it and retry)")]
    ManagerUnreachable { endpoint: String, detail: String },

    /// A save for this URL is already running.
    #[error("a save is already in progress for {0}")]
    DuplicateSaveInProgress(String),

    /// The requested collection target matched nothing.
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    /// Malformed or missing request input.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Headless-browser launch or navigation failure.
    #[error("browser error: {0}")]
    Browser(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// A parse failure with a bounded snippet of the payload that caused it.
    pub fn parse(
        source_id: impl Into<String>,
        detail: impl Into<String>,
        snippet: &str,
    ) -> Self {
        Error::Parse {
            source_id: source_id.into(),
            detail: detail.into(),
            snippet: snippet.chars().take(SNIPPET_LEN).collect(),
        }
    }

    /// Whether this failure is consistent with a page that needed
    /// client-side rendering. Drives the one-shot strategy escalation.
    pub fn suggests_rendering(&self) -> bool {
        matches!(self, Error::Parse { .. })
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Network(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::parse("json", e.to_string(), "")
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::InvalidRequest(format!("bad URL: {}", e))
    }
}
