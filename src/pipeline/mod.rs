//! Fetch → transform → respond pipeline.
//!
//! # Data Flow
//! ```text
//! EdgeEvent
//!     → interpreter.rs (origin, resource path, clamped width/height)
//!     → scratch.rs (per-invocation source/target slots)
//!     → fetcher.rs (GET origin, stream 200 body into source)
//!     → headers.rs (sanitize origin headers)
//!     → non-200? pass status + headers through, done
//!     → transform.rs (external tool: source → target)
//!     → read target, base64 → EdgeResponse
//! ```
//!
//! # Design Decisions
//! - Stages run strictly in sequence; the first failure ends the invocation
//! - Validation happens before any disk or network I/O
//! - Every invocation produces exactly one `EdgeResponse`
//! - Settings are snapshotted per invocation so reloads never tear a request

pub mod error;
pub mod fetcher;
pub mod headers;
pub mod interpreter;
pub mod scratch;
pub mod transform;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::edge::event::{CustomOrigin, EdgeEvent};
use crate::edge::response::EdgeResponse;
use crate::observability::metrics;

pub use error::{ErrorKind, PipelineError};
pub use fetcher::{FetchError, HttpOriginFetcher, OriginFetcher, OriginHeader, OriginResponse};
pub use headers::SanitizedHeaders;
pub use interpreter::{DimensionPolicy, Interpretation, InterpretError, TransformRequest};
pub use scratch::ScratchSpace;
pub use transform::{CommandTransformer, ResizeSpec, TransformError, TransformJob, Transformer};

/// Reloadable knobs that shape each invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub dimensions: DimensionPolicy,
    pub quality: u8,
    pub sharpen: Option<String>,
    pub scratch_dir: PathBuf,
    /// Origin used when a viewer request arrives without a trigger event.
    pub viewer_origin: Option<CustomOrigin>,
}

impl PipelineSettings {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            dimensions: DimensionPolicy {
                max_dimension: config.resize.max_dimension,
                reject_invalid: config.resize.reject_invalid_dimensions,
            },
            quality: config.resize.quality,
            sharpen: config.resize.sharpen.clone(),
            scratch_dir: config.scratch.resolved_dir(),
            viewer_origin: config.origin.as_ref().map(CustomOrigin::from),
        }
    }

    fn resize_spec(&self, width: u32, height: u32) -> ResizeSpec {
        ResizeSpec {
            width,
            height,
            quality: self.quality,
            sharpen: self.sharpen.clone(),
        }
    }
}

/// The image pipeline with its injected collaborators.
pub struct Pipeline {
    settings: ArcSwap<PipelineSettings>,
    fetcher: Arc<dyn OriginFetcher>,
    transformer: Arc<dyn Transformer>,
}

impl Pipeline {
    pub fn new(
        settings: PipelineSettings,
        fetcher: Arc<dyn OriginFetcher>,
        transformer: Arc<dyn Transformer>,
    ) -> Self {
        Self {
            settings: ArcSwap::from_pointee(settings),
            fetcher,
            transformer,
        }
    }

    /// Production pipeline: `reqwest` fetcher and the configured tool.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(
            PipelineSettings::from_config(config),
            Arc::new(HttpOriginFetcher::new()?),
            Arc::new(CommandTransformer::new(config.transformer.program.clone())),
        ))
    }

    /// Current settings snapshot.
    pub fn settings(&self) -> Arc<PipelineSettings> {
        self.settings.load_full()
    }

    /// Swap in settings from a reloaded configuration.
    pub fn reload(&self, config: &GatewayConfig) {
        let next = PipelineSettings::from_config(config);
        tracing::info!(
            max_dimension = next.dimensions.max_dimension,
            reject_invalid = next.dimensions.reject_invalid,
            sharpen = ?next.sharpen,
            "Pipeline settings reloaded"
        );
        self.settings.store(Arc::new(next));
    }

    /// Run one invocation. Always yields a response.
    pub async fn invoke(&self, event: &EdgeEvent) -> EdgeResponse {
        let invocation_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "invocation",
            id = %invocation_id,
            origin = tracing::field::Empty,
            width = tracing::field::Empty,
            height = tracing::field::Empty,
        );

        async move {
            let settings = self.settings();
            let response = match self.run(&settings, event).await {
                Ok(response) => response,
                Err(e) => {
                    let kind = e.kind();
                    if let Some(stderr) = transform_diagnostics(&e) {
                        tracing::warn!(stderr = %stderr, "Transformer diagnostics");
                    }
                    if kind == ErrorKind::InvalidInput {
                        tracing::info!(error = %e, "Rejected request");
                    } else {
                        tracing::error!(error = %e, kind = kind.as_str(), "Invocation failed");
                    }
                    e.to_response()
                }
            };

            let status = response.status_code().unwrap_or_default();
            metrics::record_invocation(status);
            tracing::info!(status, description = %response.status_description, "Invocation complete");
            response
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        settings: &PipelineSettings,
        event: &EdgeEvent,
    ) -> Result<EdgeResponse, PipelineError> {
        let interpreted = interpreter::interpret(event, &settings.dimensions)?;
        let url = interpreted.request.origin_url();
        tracing::Span::current()
            .record("origin", url.as_str())
            .record("width", interpreted.width)
            .record("height", interpreted.height);
        tracing::info!("Request interpreted");

        let scratch = ScratchSpace::create_in(&settings.scratch_dir).map_err(PipelineError::Scratch)?;

        let started = Instant::now();
        let origin = self.fetcher.fetch(&url, scratch.source_path()).await?;
        metrics::record_stage("fetch", started);

        let headers = SanitizedHeaders::from_origin(&origin.headers);
        if !origin.is_success() {
            tracing::info!(status = origin.status, "Passing origin status through");
            return Ok(EdgeResponse::pass_through(origin.status, headers));
        }
        if !origin.body_complete {
            return Err(FetchError::Incomplete {
                received: origin.body_bytes,
            }
            .into());
        }
        metrics::record_origin_bytes(origin.body_bytes);

        let spec = settings.resize_spec(interpreted.width, interpreted.height);
        let job = TransformJob {
            source: scratch.source_path(),
            target: scratch.target_path(),
            spec: &spec,
        };

        let started = Instant::now();
        if let Err(e) = self.transformer.transform(&job).await {
            metrics::record_transform_failure("tool");
            return Err(e.into());
        }
        metrics::record_stage("transform", started);

        let image = tokio::fs::read(scratch.target_path()).await.map_err(|source| {
            metrics::record_transform_failure("output");
            TransformError::Output {
                path: scratch.target_path().to_path_buf(),
                source,
            }
        })?;

        tracing::debug!(bytes = image.len(), "Transformed image read back");
        Ok(EdgeResponse::image(headers, &image))
    }
}

fn transform_diagnostics(error: &PipelineError) -> Option<&str> {
    match error {
        PipelineError::Transform(e) => e.diagnostics(),
        _ => None,
    }
}
