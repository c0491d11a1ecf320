use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Url};

use crate::error::FetchError;

/// A fetched response body and its declared media type.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub body: Vec<u8>,
    pub media_type: Option<String>,
}

/// Where dashboard pages and their assets come from.
///
/// [`DashboardClient`] is the HTTP implementation; tests substitute an
/// in-memory one.
pub trait PageSource {
    /// Fetches the dashboard page itself.
    fn fetch_page(&self) -> impl Future<Output = Result<Fetched, FetchError>> + Send;

    /// Fetches an asset referenced by the page. `source` may be relative to
    /// the page URL.
    fn fetch_asset(&self, source: &str) -> impl Future<Output = Result<Fetched, FetchError>> + Send;
}

/// HTTP client for the dashboard page and its chart images.
///
/// Every request is bounded by the configured timeout; a timeout surfaces as
/// [`FetchError::Timeout`] rather than hanging the capture cycle. There is no
/// retry: a failed fetch fails the cycle.
pub struct DashboardClient {
    client: Client,
    page_url: Url,
}

impl DashboardClient {
    /// Creates a client for `page_url` with the given timeout and `User-Agent`.
    ///
    /// # Errors
    ///
    /// - [`FetchError::InvalidUrl`] if `page_url` is not an absolute http(s) URL.
    /// - [`FetchError::Http`] if the underlying `reqwest::Client` cannot be
    ///   constructed (e.g., invalid TLS config).
    pub fn new(page_url: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, FetchError> {
        let parsed = Url::parse(page_url).map_err(|e| FetchError::InvalidUrl {
            url: page_url.to_owned(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl {
                url: page_url.to_owned(),
                reason: format!("unsupported scheme \"{}\"", parsed.scheme()),
            });
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.min(10)))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            page_url: parsed,
        })
    }

    #[must_use]
    pub fn page_url(&self) -> &str {
        self.page_url.as_str()
    }

    /// Resolves an asset reference against the page URL.
    fn resolve(&self, source: &str) -> Result<Url, FetchError> {
        self.page_url
            .join(source.trim())
            .map_err(|e| FetchError::InvalidUrl {
                url: source.to_owned(),
                reason: e.to_string(),
            })
    }

    async fn get(&self, url: Url) -> Result<Fetched, FetchError> {
        let url_string = url.to_string();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify(e, &url_string))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::UnexpectedStatus {
                status: status.as_u16(),
                url: url_string,
            });
        }

        let media_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let body = response
            .bytes()
            .await
            .map_err(|e| classify(e, &url_string))?;

        tracing::debug!(url = %url_string, bytes = body.len(), "fetched");
        Ok(Fetched {
            body: body.to_vec(),
            media_type,
        })
    }
}

impl PageSource for DashboardClient {
    async fn fetch_page(&self) -> Result<Fetched, FetchError> {
        self.get(self.page_url.clone()).await
    }

    async fn fetch_asset(&self, source: &str) -> Result<Fetched, FetchError> {
        let url = self.resolve(source)?;
        self.get(url).await
    }
}

fn classify(err: reqwest::Error, url: &str) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            url: url.to_owned(),
        }
    } else {
        FetchError::Http(err)
    }
}
