//! Origin retrieval.
//!
//! # Responsibilities
//! - Single GET against the origin (plain or TLS, chosen by URL scheme)
//! - Capture status and headers for every response
//! - Stream a 200 body straight into scratch storage
//!
//! # Design Decisions
//! - No retries, no redirect following: 3xx is forwarded like any non-200
//! - No idle connection pool, so nothing outlives the invocation
//! - A body cut short by the origin surfaces as a body read error; the HTTP
//!   client enforces the declared Content-Length

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::HeaderMap;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// A raw origin header. Repeated headers are joined into one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginHeader {
    pub name: String,
    pub value: String,
}

/// What the origin returned. The body itself lives in scratch storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginResponse {
    pub status: u16,
    pub headers: Vec<OriginHeader>,
    /// Bytes written to the sink (0 for non-200).
    pub body_bytes: u64,
    /// True once a 200 body has been fully written and flushed. A 200 without
    /// a complete body is never transformed.
    pub body_complete: bool,
}

impl OriginResponse {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid origin URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("origin request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("origin body read failed: {0}")]
    Body(#[source] reqwest::Error),

    #[error("origin body incomplete after {received} bytes")]
    Incomplete { received: u64 },

    #[error("failed to write origin body to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// Disk-side failures, as opposed to network-side ones.
    pub fn is_write(&self) -> bool {
        matches!(self, FetchError::Write { .. })
    }
}

/// Retrieves an origin object.
#[async_trait]
pub trait OriginFetcher: Send + Sync {
    /// GET `url`. On a 200 the body is streamed into a new file at `sink`;
    /// for any other status the body is discarded.
    async fn fetch(&self, url: &str, sink: &Path) -> Result<OriginResponse, FetchError>;
}

/// `reqwest`-backed fetcher used in production.
#[derive(Debug, Clone)]
pub struct HttpOriginFetcher {
    client: reqwest::Client,
}

impl HttpOriginFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .pool_max_idle_per_host(0)
            .user_agent(concat!("edge-image-gateway/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl OriginFetcher for HttpOriginFetcher {
    async fn fetch(&self, url: &str, sink: &Path) -> Result<OriginResponse, FetchError> {
        let parsed = url::Url::parse(url).map_err(|source| FetchError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(FetchError::Request)?;

        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());
        tracing::debug!(status, header_count = headers.len(), "Origin responded");

        if status != 200 {
            return Ok(OriginResponse {
                status,
                headers,
                body_bytes: 0,
                body_complete: false,
            });
        }

        let write_error = |source| FetchError::Write {
            path: sink.to_path_buf(),
            source,
        };

        let mut file = File::create(sink).await.map_err(write_error)?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(FetchError::Body)?;
            file.write_all(&chunk).await.map_err(write_error)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(write_error)?;

        tracing::debug!(bytes = written, "Origin body stored");
        Ok(OriginResponse {
            status,
            headers,
            body_bytes: written,
            body_complete: true,
        })
    }
}

fn collect_headers(map: &HeaderMap) -> Vec<OriginHeader> {
    map.keys()
        .map(|name| {
            let value = map
                .get_all(name)
                .iter()
                .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
                .collect::<Vec<_>>()
                .join(", ");
            OriginHeader {
                name: name.as_str().to_string(),
                value,
            }
        })
        .collect()
}
