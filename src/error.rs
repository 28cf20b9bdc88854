//! Error types for the search engine
//!
//! Startup failures surface as [`Error::StoreOpen`]; everything else is a
//! per-call error returned to the caller. A hit whose content record has
//! disappeared is not an error at all (see [`crate::hydrate`]).

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the search engine
#[derive(Debug, Error)]
pub enum Error {
    /// The index directory could not be created, opened or validated
    #[error("failed to open index at {}: {reason}", path.display())]
    StoreOpen {
        /// Index directory
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// The keyword could not be parsed
    #[error(transparent)]
    QueryParse(#[from] QueryParseError),

    /// A search request failed; the cause is attached
    #[error("search failed: {0}")]
    SearchExecution(#[source] Box<Error>),

    /// Another writer holds the index
    #[error("index writer unavailable: {0}")]
    MutationLock(String),

    /// `init()` has not completed successfully
    #[error("search engine is not initialized")]
    NotInitialized,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Index files are inconsistent or truncated
    #[error("index corruption: {0}")]
    Corruption(String),

    /// Metadata could not be (de)serialized
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration values out of range
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The external content store failed
    #[error("content store error: {0}")]
    ContentStore(String),

    /// Invalid page request
    #[error("invalid page request: page {page_number}, size {page_size}")]
    InvalidPage {
        /// Requested page (1-based)
        page_number: usize,
        /// Requested page size
        page_size: usize,
    },
}

impl Error {
    /// Wrap a failure that happened while serving a search request.
    pub fn search(cause: Error) -> Self {
        match cause {
            already @ Error::SearchExecution(_) => already,
            other => Error::SearchExecution(Box::new(other)),
        }
    }

    /// True if this error (or the search failure it wraps) is a keyword
    /// parse error.
    pub fn is_query_parse(&self) -> bool {
        match self {
            Error::QueryParse(_) => true,
            Error::SearchExecution(inner) => inner.is_query_parse(),
            _ => false,
        }
    }

    pub(crate) fn store_open(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::StoreOpen {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// A keyword that does not follow the query syntax
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot parse {keyword:?} at offset {position}: {reason}")]
pub struct QueryParseError {
    /// The keyword as given by the caller
    pub keyword: String,
    /// Byte offset of the offending input
    pub position: usize,
    /// Human readable reason
    pub reason: String,
}

impl QueryParseError {
    pub(crate) fn new(keyword: &str, position: usize, reason: impl Into<String>) -> Self {
        Self {
            keyword: keyword.to_string(),
            position,
            reason: reason.into(),
        }
    }
}
