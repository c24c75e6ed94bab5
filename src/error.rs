use jiff::civil::Date;
use thiserror::Error;

/// Failure reported by one of the storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("already exists")]
    AlreadyExists,
    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid request: {0}")]
    Request(String),
    #[error("S3 request failed: {0}")]
    S3(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Failure reported by the upstream report source.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid request: {0}")]
    Request(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{backend} fault at {locator}: {source}")]
    Backend {
        backend: String,
        locator: String,
        #[source]
        source: StoreError,
    },
    #[error("report for {date} could not be fetched: {source}")]
    Upstream {
        date: Date,
        #[source]
        source: UpstreamError,
    },
    #[error("configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
