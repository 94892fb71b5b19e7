//! Error types for fetching and preparing LRA data

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("download failed: HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("checksum mismatch for {path:?} (expected '{expected}' but got '{actual}')")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("failed to extract {path:?}: {reason}")]
    Archive { path: PathBuf, reason: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("{0}")]
    UnknownTask(String),

    #[error("missing data: {0:?} does not exist (run `lra-data fetch` first)")]
    MissingData(PathBuf),

    #[error("invalid record at {path:?}:{line}: {reason}")]
    InvalidRecord {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("operation cancelled")]
    Cancelled,
}

impl DataError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn request(url: &str, source: reqwest::Error) -> Self {
        Self::Request {
            url: url.to_string(),
            source,
        }
    }

    /// Whether retrying the same operation could succeed.
    ///
    /// Connection problems, timeouts, broken bodies, 408/429 and 5xx responses
    /// are transient. Everything else (4xx, checksum, disk, config) is not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request { source, .. } => {
                source.is_connect()
                    || source.is_timeout()
                    || source.is_body()
                    || source.is_request()
            }
            Self::HttpStatus { status, .. } => {
                *status == 408 || *status == 429 || (500..600).contains(status)
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
