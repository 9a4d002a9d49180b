//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use edge_image_gateway::edge::event::{CustomOrigin, EdgeEvent, OriginProtocol};
use edge_image_gateway::pipeline::interpreter::DimensionPolicy;
use edge_image_gateway::pipeline::{
    FetchError, HttpOriginFetcher, OriginFetcher, OriginHeader, OriginResponse, PipelineSettings, ResizeSpec,
    TransformError, TransformJob, Transformer,
};

pub const FIXTURE_PNG: &[u8] = include_bytes!("../fixtures/pixel-10x10.png");

/// What the mock origin answers with.
#[derive(Debug, Clone)]
pub struct OriginReply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl OriginReply {
    pub fn new(status: u16, headers: &[(&str, &str)], body: &[u8]) -> Self {
        Self {
            status,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: body.to_vec(),
        }
    }
}

/// Start a programmable origin on an ephemeral port.
///
/// Returns the bound address and the request lines it has seen.
pub async fn start_origin<F, Fut>(f: F) -> (SocketAddr, Arc<Mutex<Vec<String>>>)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = OriginReply> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let log = seen.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else { break };
            let f = f.clone();
            let log = log.clone();
            tokio::spawn(async move {
                let Some(line) = read_request_line(&mut socket).await else { return };
                log.lock().unwrap().push(line);

                let reply = f().await;
                let mut response = format!("HTTP/1.1 {} Mock\r\n", reply.status);
                for (name, value) in &reply.headers {
                    response.push_str(&format!("{}: {}\r\n", name, value));
                }
                response.push_str(&format!(
                    "Content-Length: {}\r\nConnection: close\r\n\r\n",
                    reply.body.len()
                ));

                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.write_all(&reply.body).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, seen)
}

/// Start an origin that writes `raw` verbatim to every connection and closes.
///
/// Lets tests send framing a well-behaved server never would.
pub async fn start_raw_origin(raw: Vec<u8>) -> (SocketAddr, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let raw = Arc::new(raw);

    let log = seen.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else { break };
            let raw = raw.clone();
            let log = log.clone();
            tokio::spawn(async move {
                let Some(line) = read_request_line(&mut socket).await else { return };
                log.lock().unwrap().push(line);

                let _ = socket.write_all(&raw).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, seen)
}

async fn read_request_line(socket: &mut TcpStream) -> Option<String> {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return None,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
    String::from_utf8_lossy(&head).lines().next().map(str::to_string)
}

/// Start an origin that always returns the same reply.
pub async fn start_static_origin(reply: OriginReply) -> (SocketAddr, Arc<Mutex<Vec<String>>>) {
    start_origin(move || {
        let reply = reply.clone();
        async move { reply }
    })
    .await
}

pub fn origin_at(addr: SocketAddr) -> CustomOrigin {
    CustomOrigin {
        protocol: OriginProtocol::Http,
        domain_name: addr.to_string(),
        path: "/originals".into(),
    }
}

pub fn event_for(origin: CustomOrigin, query: &str) -> EdgeEvent {
    EdgeEvent::for_request(origin, "/cat.png", query)
}

pub fn settings(scratch: &Path, max_dimension: u32) -> PipelineSettings {
    PipelineSettings {
        dimensions: DimensionPolicy {
            max_dimension,
            reject_invalid: true,
        },
        quality: 80,
        sharpen: None,
        scratch_dir: scratch.to_path_buf(),
        viewer_origin: None,
    }
}

/// Fetcher that serves a canned reply and counts calls.
pub struct CountingFetcher {
    reply: OriginReply,
    calls: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

impl CountingFetcher {
    pub fn new(reply: OriginReply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl OriginFetcher for CountingFetcher {
    async fn fetch(&self, url: &str, sink: &Path) -> Result<OriginResponse, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());

        let headers = self
            .reply
            .headers
            .iter()
            .map(|(name, value)| OriginHeader {
                name: name.clone(),
                value: value.clone(),
            })
            .collect();

        if self.reply.status != 200 {
            return Ok(OriginResponse {
                status: self.reply.status,
                headers,
                body_bytes: 0,
                body_complete: false,
            });
        }

        tokio::fs::write(sink, &self.reply.body)
            .await
            .map_err(|source| FetchError::Write {
                path: sink.to_path_buf(),
                source,
            })?;
        Ok(OriginResponse {
            status: 200,
            headers,
            body_bytes: self.reply.body.len() as u64,
            body_complete: true,
        })
    }
}

/// Real fetcher whose scratch directory disappears before the body is stored.
pub struct VanishingScratchFetcher {
    inner: HttpOriginFetcher,
}

impl VanishingScratchFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: HttpOriginFetcher::new().unwrap(),
        })
    }
}

#[async_trait]
impl OriginFetcher for VanishingScratchFetcher {
    async fn fetch(&self, url: &str, sink: &Path) -> Result<OriginResponse, FetchError> {
        if let Some(dir) = sink.parent() {
            tokio::fs::remove_dir_all(dir).await.unwrap();
        }
        self.inner.fetch(url, sink).await
    }
}

/// Fetcher that answers 200 but reports the body as not fully stored.
pub struct PartialBodyFetcher;

#[async_trait]
impl OriginFetcher for PartialBodyFetcher {
    async fn fetch(&self, _url: &str, sink: &Path) -> Result<OriginResponse, FetchError> {
        tokio::fs::write(sink, &FIXTURE_PNG[..16]).await.unwrap();
        Ok(OriginResponse {
            status: 200,
            headers: vec![OriginHeader {
                name: "content-type".into(),
                value: "image/png".into(),
            }],
            body_bytes: 16,
            body_complete: false,
        })
    }
}

/// Transformer that copies source to target and records each spec.
#[derive(Default)]
pub struct CopyTransformer {
    specs: Mutex<Vec<ResizeSpec>>,
    scratch_roots: Mutex<Vec<PathBuf>>,
}

impl CopyTransformer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn specs(&self) -> Vec<ResizeSpec> {
        self.specs.lock().unwrap().clone()
    }

    pub fn scratch_roots(&self) -> Vec<PathBuf> {
        self.scratch_roots.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transformer for CopyTransformer {
    async fn transform(&self, job: &TransformJob<'_>) -> Result<(), TransformError> {
        self.specs.lock().unwrap().push(job.spec.clone());
        if let Some(root) = job.source.parent() {
            self.scratch_roots.lock().unwrap().push(root.to_path_buf());
        }
        tokio::fs::copy(job.source, job.target)
            .await
            .map_err(|source| TransformError::Spawn {
                program: "copy".into(),
                source,
            })?;
        Ok(())
    }
}

/// Transformer that exits like a tool rejecting its input.
pub struct FailingTransformer;

#[async_trait]
impl Transformer for FailingTransformer {
    async fn transform(&self, _job: &TransformJob<'_>) -> Result<(), TransformError> {
        Err(TransformError::Failed {
            program: "convert".into(),
            code: Some(1),
            stderr: "convert: improper image header `source'".into(),
        })
    }
}

/// Transformer that reports success without writing a target.
pub struct SilentTransformer;

#[async_trait]
impl Transformer for SilentTransformer {
    async fn transform(&self, _job: &TransformJob<'_>) -> Result<(), TransformError> {
        Ok(())
    }
}
