//! Source acquisition, network half: validate the URL and fetch the page.
//!
//! Exactly one request is made per extraction. Transport errors, timeouts
//! and non-2xx statuses all surface immediately as fetch-kind
//! [`ExtractError`]s; nothing is retried.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Capability to turn a URL into raw markup.
///
/// [`HttpFetcher`] is the production implementation; tests and embedders
/// can inject their own through [`crate::extract::Extractor::with_parts`].
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the page body as text.
    async fn fetch(&self, url: &Url) -> Result<String, ExtractError>;
}

/// Parse and check a caller-supplied URL.
///
/// Only absolute `http`/`https` URLs with a host are accepted.
pub fn parse_source_url(input: &str) -> Result<Url, ExtractError> {
    let trimmed = input.trim();
    let url = Url::parse(trimmed).map_err(|e| ExtractError::InvalidUrl {
        input: input.to_string(),
        reason: e.to_string(),
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ExtractError::InvalidUrl {
            input: input.to_string(),
            reason: format!("unsupported scheme '{}', expected http or https", url.scheme()),
        });
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ExtractError::InvalidUrl {
            input: input.to_string(),
            reason: "URL has no host".to_string(),
        });
    }
    Ok(url)
}

/// `reqwest`-backed [`PageFetcher`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpFetcher {
    /// Build a fetcher from the timeout and user agent in `config`.
    pub fn new(config: &ExtractionConfig) -> Result<Self, ExtractError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.fetch_timeout_secs.min(10)))
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| ExtractError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout_secs: config.fetch_timeout_secs,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, ExtractError> {
        info!("Fetching recipe page: {}", url);

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                ExtractError::FetchTimeout {
                    url: url.to_string(),
                    secs: self.timeout_secs,
                }
            } else {
                ExtractError::FetchFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::FetchStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                ExtractError::FetchTimeout {
                    url: url.to_string(),
                    secs: self.timeout_secs,
                }
            } else {
                ExtractError::FetchFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;
        debug!("Fetched {} bytes from {}", bytes.len(), url);

        // Lossy decode: one bad byte must not fail the page.
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn accepts_http_and_https() {
        assert!(parse_source_url("https://example.com/recipes/pancakes").is_ok());
        assert!(parse_source_url("http://example.com/r?id=3").is_ok());
        assert!(parse_source_url("  https://example.com/  ").is_ok());
    }

    #[test]
    fn rejects_relative_and_non_http() {
        for bad in ["/recipes/pancakes", "pancakes", "", "ftp://example.com/r", "file:///etc/passwd"] {
            let err = parse_source_url(bad).unwrap_err();
            assert!(
                matches!(err, ExtractError::InvalidUrl { .. }),
                "{bad:?} should be InvalidUrl, got {err:?}"
            );
        }
    }

    #[test]
    fn http_fetcher_builds_from_default_config() {
        let fetcher = HttpFetcher::new(&ExtractionConfig::default()).expect("client builds");
        assert_eq!(fetcher.timeout_secs, 30);
    }

    // ── Local server helpers ─────────────────────────────────────────────

    /// Answer one request on a loopback port with a canned HTTP response.
    async fn serve_once(response: &'static str) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        Url::parse(&format!("http://{addr}/recipe")).expect("url")
    }

    fn fetcher_with_timeout(secs: u64) -> HttpFetcher {
        let config = ExtractionConfig::builder()
            .fetch_timeout_secs(secs)
            .build()
            .expect("valid config");
        HttpFetcher::new(&config).expect("client builds")
    }

    #[tokio::test]
    async fn fetch_returns_body_on_success() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 21\r\nConnection: close\r\n\r\n<p>Boil the eggs.</p>",
        )
        .await;

        let html = fetcher_with_timeout(5).fetch(&url).await.expect("fetch ok");
        assert_eq!(html, "<p>Boil the eggs.</p>");
    }

    #[tokio::test]
    async fn fetch_maps_not_found_to_status_error() {
        let url = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 9\r\nConnection: close\r\n\r\nnot found",
        )
        .await;

        let err = fetcher_with_timeout(5).fetch(&url).await.unwrap_err();
        assert!(
            matches!(err, ExtractError::FetchStatus { status: 404, .. }),
            "got {err:?}"
        );
        assert_eq!(err.kind(), FailureKind::Fetch);
    }

    #[tokio::test]
    async fn fetch_maps_refused_connection_to_fetch_failed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);
        let url = Url::parse(&format!("http://{addr}/recipe")).expect("url");

        let err = fetcher_with_timeout(5).fetch(&url).await.unwrap_err();
        assert!(matches!(err, ExtractError::FetchFailed { .. }), "got {err:?}");
        assert_eq!(err.kind(), FailureKind::Fetch);
    }

    #[tokio::test]
    async fn fetch_maps_silent_server_to_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        // Accept and hold the connection without answering.
        tokio::spawn(async move {
            if let Ok((socket, _)) = listener.accept().await {
                tokio::time::sleep(Duration::from_secs(5)).await;
                drop(socket);
            }
        });
        let url = Url::parse(&format!("http://{addr}/recipe")).expect("url");

        let err = fetcher_with_timeout(1).fetch(&url).await.unwrap_err();
        assert!(
            matches!(err, ExtractError::FetchTimeout { secs: 1, .. }),
            "got {err:?}"
        );
    }
}
