//! Error types.
//!
//! Three families, matching where a failure can surface:
//!
//! - [`QueryError`] - rejected caller input, raised at the transport boundary
//! - [`IndexError`] - a single file that could not be loaded; logged and
//!   skipped by the index builder, never returned from a query
//! - [`SourceError`] - failures of an [`AdvisorySource`](crate::source::AdvisorySource)

use std::path::PathBuf;
use thiserror::Error;

/// Invalid query input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Invalid date filter '{0}': expected YYYY-MM-DD or YYYY-MM-DD..YYYY-MM-DD")]
    InvalidDateFilter(String),

    #[error("Unknown ecosystem '{0}'. Use: rubygems, npm, pip, maven, nuget, composer, go, rust, erlang, actions, pub, swift, other")]
    InvalidEcosystem(String),

    #[error("Unknown severity '{0}'. Use: low, medium, high, critical, unknown")]
    InvalidSeverity(String),

    #[error("Unknown sort field '{0}'. Use: published, updated")]
    InvalidSort(String),

    #[error("Unknown sort direction '{0}'. Use: asc, desc")]
    InvalidDirection(String),

    #[error("per_page must be between 1 and 100, got {0}")]
    InvalidPerPage(usize),

    #[error("page must be 1 or greater")]
    InvalidPage,

    #[error("A non-empty search query is required")]
    MissingQuery,
}

/// Failure to load one advisory file.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure reported through the data source contract.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Source '{0}' does not support {1}")]
    Unsupported(&'static str, &'static str),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream '{source_name}' returned {status}: {message}")]
    Upstream {
        source_name: &'static str,
        status: u16,
        message: String,
    },
}

impl SourceError {
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(..))
    }

    /// True when the failure was caused by the caller's input rather than
    /// by the source itself.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Query(_))
    }
}

pub type SourceResult<T> = std::result::Result<T, SourceError>;
