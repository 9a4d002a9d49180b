//! Request-side helpers.
//!
//! # Responsibilities
//! - Request ID header name and lookup
//! - Turn a plain viewer request into a trigger event (viewer mode)
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing (outermost layer)
//! - The viewer URI path is used verbatim, like the trigger's `uri`

use axum::http::{HeaderMap, Uri};

use crate::edge::event::{CustomOrigin, EdgeEvent};

pub const X_REQUEST_ID: &str = "x-request-id";

/// Request ID set by the middleware stack, or `unknown`.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Trigger event for a viewer request against the default origin.
pub fn viewer_event(origin: CustomOrigin, uri: &Uri) -> EdgeEvent {
    EdgeEvent::for_request(origin, uri.path(), uri.query().unwrap_or(""))
}
