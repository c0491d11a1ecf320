use std::path::PathBuf;

use covdash_core::HashError;
use covdash_scraper::{FetchError, ImageFetchError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("archive entry already exists: {}", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("capture {0} not found in the archive")]
    NotFound(String),

    #[error("{0:?} is not a capture name")]
    InvalidName(String),

    #[error("image identifier {0:?} cannot be used as a file name")]
    InvalidIdentifier(String),

    #[error("naming lock for {prefix} still held after {waited_ms} ms")]
    Locked { prefix: String, waited_ms: u128 },

    #[error("the archive holds no captures yet")]
    Empty,
}

#[derive(Debug, Error)]
pub enum DetectError {
    /// A comparison image could not be fetched. The comparison is
    /// inconclusive and must not be read as "unchanged".
    #[error("comparison failed fetching {identifier}: {source}")]
    ComparisonFailed {
        identifier: String,
        #[source]
        source: FetchError,
    },

    #[error("comparison image {identifier} has unhashable content: {source}")]
    UnsupportedContent {
        identifier: String,
        #[source]
        source: HashError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ImageFetchError> for DetectError {
    fn from(err: ImageFetchError) -> Self {
        match err {
            ImageFetchError::Fetch { identifier, source } => {
                Self::ComparisonFailed { identifier, source }
            }
            ImageFetchError::Content { identifier, source } => {
                Self::UnsupportedContent { identifier, source }
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("fetch failed: {0}")]
    FetchFailed(#[from] FetchError),

    #[error("dashboard page has unhashable content: {0}")]
    PageContent(#[from] HashError),

    #[error("image download failed: {0}")]
    Images(#[from] ImageFetchError),

    #[error(transparent)]
    Detect(#[from] DetectError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
