//! Error types for the reqwest-proxy-cache crate.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while maintaining or selecting from the proxy pool.
#[derive(Debug, Error)]
pub enum Error {
    /// The pool file could not be created, read, written or removed.
    #[error("store error on {path}: {source}")]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Every configured source list failed to download during a refresh.
    #[error("all {0} proxy sources failed to fetch")]
    Fetch(usize),
    /// A refresh completed but the parser found no proxy candidates.
    #[error("no proxies found in {0} fetched source(s)")]
    EmptyPool(usize),
    /// Every candidate in the pool failed during one selection episode.
    #[error("all proxies in the pool are bad ({0} evicted)")]
    AllProxiesBad(usize),
    /// The pool file exists but cannot be trusted. Handled by rebuilding.
    #[error("malformed pool file: {0}")]
    Malformed(String),
    /// The configured store path was rejected.
    #[error("invalid store path {0:?}: {1}")]
    InvalidPath(PathBuf, &'static str),
    /// A configuration value was rejected.
    #[error("configuration error: {0}")]
    Config(String),
    /// A single HTTP request failed.
    #[error("request failed: {0}")]
    Request(String),
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Request(format!("timed out: {}", err))
        } else {
            Error::Request(err.to_string())
        }
    }
}

impl Error {
    pub(crate) fn store(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Store {
            path: path.into(),
            source,
        }
    }
}
