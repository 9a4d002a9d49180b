//! Response object handed back to the edge platform.

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

use crate::pipeline::headers::SanitizedHeaders;

/// One emitted header: original-case name plus raw value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HeaderEntry {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyEncoding {
    Base64,
}

/// Terminal artifact of one invocation.
///
/// `body` is only present on a successful transform, in which case it holds
/// the base64 text of the image and `body_encoding` is `Base64`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeResponse {
    pub status: String,
    pub status_description: String,
    #[serde(default)]
    pub headers: SanitizedHeaders,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_encoding: Option<BodyEncoding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl EdgeResponse {
    /// 200 response carrying the transformed image.
    pub fn image(headers: SanitizedHeaders, image: &[u8]) -> Self {
        Self {
            status: "200".to_string(),
            status_description: "OK".to_string(),
            headers,
            body_encoding: Some(BodyEncoding::Base64),
            body: Some(general_purpose::STANDARD.encode(image)),
        }
    }

    /// Forward a non-200 origin status with its sanitized headers.
    pub fn pass_through(status: u16, headers: SanitizedHeaders) -> Self {
        let description = axum::http::StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or("Unknown");

        Self {
            status: status.to_string(),
            status_description: description.to_string(),
            headers,
            body_encoding: None,
            body: None,
        }
    }

    /// Pipeline failure: status and description only.
    pub fn error(status: u16, description: impl Into<String>) -> Self {
        Self {
            status: status.to_string(),
            status_description: description.into(),
            headers: SanitizedHeaders::default(),
            body_encoding: None,
            body: None,
        }
    }

    /// Numeric status, if `status` holds a valid code.
    pub fn status_code(&self) -> Option<u16> {
        self.status.parse().ok()
    }

    /// Decode the body back into bytes.
    pub fn decoded_body(&self) -> Result<Option<Vec<u8>>, base64::DecodeError> {
        match (&self.body, self.body_encoding) {
            (Some(body), Some(BodyEncoding::Base64)) => general_purpose::STANDARD.decode(body).map(Some),
            (Some(body), None) => Ok(Some(body.clone().into_bytes())),
            (None, _) => Ok(None),
        }
    }
}
