use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ImageFetchError {
    #[error("failed to fetch chart image {identifier}: {source}")]
    Fetch {
        identifier: String,
        #[source]
        source: FetchError,
    },

    #[error("chart image {identifier} cannot be hashed: {source}")]
    Content {
        identifier: String,
        #[source]
        source: covdash_core::HashError,
    },
}
