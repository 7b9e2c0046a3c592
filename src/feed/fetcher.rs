use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Timeout for the single feed request
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while fetching the source feed.
///
/// None of these are retried: a failed fetch aborts the run before any
/// state is touched.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the 30-second timeout
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
    /// Source URL is not an absolute http(s) URL
    #[error("Invalid source URL: {0}")]
    InvalidUrl(String),
}

/// Checks that the source is an absolute `http`/`https` URL.
///
/// Runs before any network activity so a typo fails fast.
pub fn validate_source_url(source: &str) -> Result<Url, FetchError> {
    let url = Url::parse(source).map_err(|e| FetchError::InvalidUrl(format!("{source}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(FetchError::InvalidUrl(format!(
            "{source}: unsupported scheme {scheme} (only http/https allowed)"
        ))),
    }
}

/// Builds the HTTP client shared by the fetcher and the publisher.
///
/// Reddit throttles generic user agents hard, so one is always set.
pub fn build_client(user_agent: &str) -> Result<reqwest::Client, FetchError> {
    let client = reqwest::Client::builder().user_agent(user_agent).build()?;
    Ok(client)
}

/// Fetches the raw feed payload with one GET.
///
/// # Errors
///
/// - [`FetchError::Network`] - Connection or TLS errors
/// - [`FetchError::Timeout`] - Request exceeded 30 seconds
/// - [`FetchError::HttpStatus`] - Non-2xx HTTP response
/// - [`FetchError::ResponseTooLarge`] - Response exceeded 10MB
pub async fn fetch_feed(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, FetchError> {
    fetch_limited(client, url, MAX_FEED_SIZE).await
}

async fn fetch_limited(
    client: &reqwest::Client,
    url: &str,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    tracing::debug!(url = %url, "Fetching feed");

    let response = tokio::time::timeout(FETCH_TIMEOUT, client.get(url).send())
        .await
        .map_err(|_| FetchError::Timeout)?
        .map_err(FetchError::Network)?;

    if !response.status().is_success() {
        return Err(FetchError::HttpStatus(response.status().as_u16()));
    }

    let bytes = read_limited_bytes(response, limit).await?;
    tracing::debug!(url = %url, bytes = bytes.len(), "Feed fetched");
    Ok(bytes)
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
