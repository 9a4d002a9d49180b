//! Rendering an `EdgeResponse` as a real HTTP response (viewer mode).
//!
//! # Design Decisions
//! - Status comes from the response object; an unparseable one becomes 502
//! - Headers that are not valid HTTP are dropped, not fatal
//! - An undecodable body becomes 502 rather than a partial image

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, StatusCode},
    response::Response,
};

use crate::edge::response::EdgeResponse;

pub fn render(edge: &EdgeResponse) -> Response {
    let Some(status) = edge
        .status_code()
        .and_then(|code| StatusCode::from_u16(code).ok())
    else {
        tracing::error!(status = %edge.status, "Response object carries an invalid status");
        return plain(StatusCode::BAD_GATEWAY, "Invalid response status");
    };

    let body = match edge.decoded_body() {
        Ok(Some(bytes)) => Body::from(bytes),
        Ok(None) => Body::empty(),
        Err(e) => {
            tracing::error!(error = %e, "Response body is not valid base64");
            return plain(StatusCode::BAD_GATEWAY, "Invalid response body");
        }
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;

    let headers = response.headers_mut();
    for entry in edge.headers.entries() {
        match (
            HeaderName::from_bytes(entry.key.as_bytes()),
            HeaderValue::from_str(&entry.value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => tracing::debug!(header = %entry.key, "Dropping header not representable in HTTP"),
        }
    }

    response
}

fn plain(status: StatusCode, message: &'static str) -> Response {
    let mut response = Response::new(Body::from(message));
    *response.status_mut() = status;
    response
}
