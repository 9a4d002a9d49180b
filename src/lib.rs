//! Edge image transformation gateway.
//!
//! Fetches an original image from an HTTP(S) origin, shrinks it with an
//! external raster tool, and answers with a CDN-compliant response object.

pub mod config;
pub mod edge;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;

pub use config::GatewayConfig;
pub use edge::{EdgeEvent, EdgeResponse};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use pipeline::Pipeline;
