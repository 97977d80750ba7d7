use std::path::PathBuf;

use shared::error::UnavailableReason;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid base url '{0}': {1}")]
    InvalidBaseUrl(String, #[source] url::ParseError),
    #[error("cannot resolve document '{document}' against {base}: {source}")]
    Resolve {
        document: String,
        base: String,
        source: url::ParseError,
    },
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),
    #[error("content unavailable: {}", .0.describe())]
    Unavailable(UnavailableReason),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewerError {
    #[error("total page count must be at least 1")]
    InvalidTotalPages,
    #[error("viewer already initialized")]
    AlreadyInitialized,
}
