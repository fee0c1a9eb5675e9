use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED,
};
use reqwest::{Client, StatusCode};

use crate::app::{Result, RoostError};
use crate::fetcher::{FetchResult, Fetcher};

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Feeds are plain text; anything past this is not a feed we want to index.
pub const MAX_FEED_BYTES: usize = 2 * 1024 * 1024;

pub struct HttpFetcher {
    client: Client,
    max_body: usize,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("text/plain"));

        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .default_headers(default_headers)
            .user_agent(concat!("roost/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            max_body: MAX_FEED_BYTES,
        })
    }
}

/// Revalidation headers for a feed we've fetched before. Validators that
/// don't form valid header values are skipped rather than failing the fetch.
fn conditional_headers(etag: Option<&str>, last_modified: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, validator) in [(IF_NONE_MATCH, etag), (IF_MODIFIED_SINCE, last_modified)] {
        if let Some(value) = validator.and_then(|v| HeaderValue::from_str(v).ok()) {
            headers.insert(name, value);
        }
    }
    headers
}

fn check_feed_size(url: &str, len: usize, max: usize) -> Result<()> {
    if len > max {
        return Err(RoostError::InvalidFeed(format!(
            "{} is {} bytes, over the {} byte limit",
            url, len, max
        )));
    }
    Ok(())
}

fn header_string(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        etag: Option<&str>,
        last_modified: Option<&str>,
    ) -> Result<FetchResult> {
        let response = self
            .client
            .get(url)
            .headers(conditional_headers(etag, last_modified))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_MODIFIED {
            return Ok(FetchResult::NotModified);
        }
        response.error_for_status_ref()?;

        // Reject oversized documents before downloading when the server
        // declares a length, and again after in case it didn't.
        if let Some(len) = response.content_length() {
            check_feed_size(url, len as usize, self.max_body)?;
        }

        let etag = header_string(response.headers(), ETAG);
        let last_modified = header_string(response.headers(), LAST_MODIFIED);

        let body = response.bytes().await?.to_vec();
        check_feed_size(url, body.len(), self.max_body)?;

        Ok(FetchResult::Content {
            body,
            etag,
            last_modified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conditional_headers_both_validators() {
        let headers = conditional_headers(Some("\"abc123\""), Some("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(headers.get(IF_NONE_MATCH).unwrap(), "\"abc123\"");
        assert_eq!(
            headers.get(IF_MODIFIED_SINCE).unwrap(),
            "Wed, 21 Oct 2015 07:28:00 GMT"
        );
    }

    #[test]
    fn test_conditional_headers_none_means_unconditional() {
        assert!(conditional_headers(None, None).is_empty());
    }

    #[test]
    fn test_conditional_headers_skips_invalid_validator() {
        // A newline can't appear in a header value; the etag is dropped, the
        // request stays otherwise conditional.
        let headers = conditional_headers(Some("bad\nvalue"), Some("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert!(headers.get(IF_NONE_MATCH).is_none());
        assert!(headers.get(IF_MODIFIED_SINCE).is_some());
    }

    #[test]
    fn test_check_feed_size_boundary() {
        assert!(check_feed_size("https://a.example/twtxt.txt", MAX_FEED_BYTES, MAX_FEED_BYTES).is_ok());
        let err = check_feed_size("https://a.example/twtxt.txt", MAX_FEED_BYTES + 1, MAX_FEED_BYTES)
            .unwrap_err();
        assert!(matches!(err, RoostError::InvalidFeed(_)));
    }

    #[tokio::test]
    async fn test_builds_with_custom_timeout() {
        assert!(HttpFetcher::with_timeout(Duration::from_secs(1)).is_ok());
    }
}
