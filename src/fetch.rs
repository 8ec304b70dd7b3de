//! Retrieval of raw USFM book documents.

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::canon::BookSpec;
use crate::config::SourceConfig;
use crate::error::{IngestError, Result};

/// Source of raw book documents.
///
/// One call is one attempt: implementations do not retry. Any non-success
/// answer from the source is an error naming the status and location.
#[async_trait]
pub trait BookFetcher: Send + Sync {
    async fn fetch(&self, book: &BookSpec) -> Result<String>;
}

/// Fetches `<base_url><source_code><extension>` over HTTP.
pub struct HttpFetcher {
    client: Client,
    base_url: Url,
    extension: String,
}

impl HttpFetcher {
    pub fn new(source: &SourceConfig) -> Result<Self> {
        let base_url = Url::parse(&source.base_url)
            .map_err(|e| IngestError::Config(format!("invalid base_url {}: {}", source.base_url, e)))?;

        let client = Client::builder()
            .timeout(source.request_timeout())
            .user_agent(concat!("tanakh-ingest/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| IngestError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            extension: source.extension.clone(),
        })
    }

    /// Location of one book's document on the source.
    pub fn book_url(&self, book: &BookSpec) -> Result<Url> {
        let file = format!("{}{}", book.source_code, self.extension);
        self.base_url
            .join(&file)
            .map_err(|e| IngestError::InvalidInput(format!("bad source code {}: {}", book.source_code, e)))
    }
}

#[async_trait]
impl BookFetcher for HttpFetcher {
    async fn fetch(&self, book: &BookSpec) -> Result<String> {
        let url = self.book_url(book)?;
        log::debug!("Fetching {}", url);

        let network_error = |e: reqwest::Error| IngestError::Network {
            url: url.to_string(),
            message: if e.is_timeout() {
                format!("request timed out: {}", e)
            } else {
                e.to_string()
            },
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::Fetch {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await.map_err(network_error)?;
        log::debug!("Fetched {} ({} bytes)", url, body.len());
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canon::hebrew_bible;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/usfm/", addr)
    }

    fn source(base_url: String) -> SourceConfig {
        SourceConfig {
            base_url,
            timeout_secs: 5,
            ..SourceConfig::default()
        }
    }

    #[test]
    fn test_book_url() {
        let fetcher = HttpFetcher::new(&SourceConfig::default()).unwrap();
        let books = hebrew_bible();
        let url = fetcher.book_url(&books[8]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://git.door43.org/unfoldingWord/hbo_uhb/raw/branch/master/09-1SA.usfm"
        );
    }

    #[tokio::test]
    async fn test_fetch_success_returns_whole_body() {
        let app = Router::new().route("/usfm/01-GEN.usfm", get(|| async { "\\c 1\n\\v 1 text\n" }));
        let fetcher = HttpFetcher::new(&source(serve(app).await)).unwrap();

        let body = fetcher.fetch(&hebrew_bible()[0]).await.unwrap();
        assert_eq!(body, "\\c 1\n\\v 1 text\n");
    }

    #[tokio::test]
    async fn test_fetch_not_found_carries_status_and_url() {
        let app = Router::new().route("/usfm/01-GEN.usfm", get(|| async { "" }));
        let fetcher = HttpFetcher::new(&source(serve(app).await)).unwrap();

        let err = fetcher.fetch(&hebrew_bible()[1]).await.unwrap_err();
        match err {
            IngestError::Fetch { status, url } => {
                assert_eq!(status, 404);
                assert!(url.ends_with("/usfm/02-EXO.usfm"));
            }
            other => panic!("expected fetch error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_server_error_is_retryable() {
        let app = Router::new().route(
            "/usfm/01-GEN.usfm",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "busy") }),
        );
        let fetcher = HttpFetcher::new(&source(serve(app).await)).unwrap();

        let err = fetcher.fetch(&hebrew_bible()[0]).await.unwrap_err();
        assert!(matches!(err, IngestError::Fetch { status: 503, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = HttpFetcher::new(&source(format!("http://{}/", addr))).unwrap();
        let err = fetcher.fetch(&hebrew_bible()[0]).await.unwrap_err();
        assert!(matches!(err, IngestError::Network { .. }));
    }
}
