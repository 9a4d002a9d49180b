//! HTTP host subsystem.
//!
//! # Data Flow
//! ```text
//! POST /invoke (trigger JSON)          GET /{*path} (viewer request)
//!     → server.rs (middleware, admission)  → request.rs (build trigger event)
//!     → pipeline                           → pipeline
//!     → JSON response object               → response.rs (render as HTTP)
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
