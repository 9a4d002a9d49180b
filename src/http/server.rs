//! HTTP host for the pipeline.
//!
//! # Responsibilities
//! - Create Axum Router with the invoke, viewer and health handlers
//! - Wire up middleware (request ID, tracing, invocation timeout)
//! - Bound concurrent invocations (503 when saturated)
//! - Apply reloaded configuration to the pipeline
//! - Serve until the shutdown signal fires
//!
//! # Routes
//! - `POST /invoke`: trigger event in, response object out
//! - `GET /healthz`: liveness
//! - `GET /{*path}`: viewer mode against `[origin]`
//!
//! `/invoke` and `/healthz` are reserved. In viewer mode an origin object at
//! either path is unreachable (`GET /invoke` answers 405, `GET /healthz`
//! answers `ok`) and is never fetched.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, OwnedSemaphorePermit, Semaphore};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::edge::event::EdgeEvent;
use crate::http::request::{request_id, viewer_event};
use crate::http::response::render;
use crate::lifecycle::shutdown::wait as wait_for_shutdown;
use crate::pipeline::Pipeline;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub permits: Arc<Semaphore>,
}

impl AppState {
    fn try_admit(&self) -> Result<OwnedSemaphorePermit, Response> {
        self.permits.clone().try_acquire_owned().map_err(|_| {
            tracing::warn!("Invocation limit reached");
            (StatusCode::SERVICE_UNAVAILABLE, "Gateway at capacity").into_response()
        })
    }
}

/// HTTP server hosting the image pipeline.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    pipeline: Arc<Pipeline>,
}

impl HttpServer {
    /// Create a server with the production pipeline.
    pub fn new(config: GatewayConfig) -> Result<Self, reqwest::Error> {
        let pipeline = Arc::new(Pipeline::from_config(&config)?);
        Ok(Self::with_pipeline(config, pipeline))
    }

    /// Create a server around an existing pipeline.
    pub fn with_pipeline(config: GatewayConfig, pipeline: Arc<Pipeline>) -> Self {
        let state = AppState {
            pipeline: pipeline.clone(),
            permits: Arc::new(Semaphore::new(config.listener.max_connections)),
        };
        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            pipeline,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/invoke", post(invoke_handler))
            .route("/healthz", get(health_handler))
            .route("/{*path}", get(viewer_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// Run the server until `shutdown` fires, applying config updates as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            max_dimension = self.config.resize.max_dimension,
            "HTTP server starting"
        );

        let pipeline = self.pipeline.clone();
        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                pipeline.reload(&config);
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(wait_for_shutdown(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// `POST /invoke`: trigger event in, response object out.
async fn invoke_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(event): Json<EdgeEvent>,
) -> Response {
    let _permit = match state.try_admit() {
        Ok(permit) => permit,
        Err(rejection) => return rejection,
    };

    tracing::debug!(request_id = %request_id(&headers), "Invocation received");
    let response = state.pipeline.invoke(&event).await;
    Json(response).into_response()
}

/// `GET /{*path}`: viewer request against the configured origin.
async fn viewer_handler(State(state): State<AppState>, headers: HeaderMap, uri: Uri) -> Response {
    let Some(origin) = state.pipeline.settings().viewer_origin.clone() else {
        return (StatusCode::NOT_FOUND, "Viewer mode is not configured").into_response();
    };

    let _permit = match state.try_admit() {
        Ok(permit) => permit,
        Err(rejection) => return rejection,
    };

    tracing::debug!(request_id = %request_id(&headers), path = %uri.path(), "Viewer request");
    let event = viewer_event(origin, &uri);
    let response = state.pipeline.invoke(&event).await;
    render(&response)
}

async fn health_handler() -> &'static str {
    "ok"
}
