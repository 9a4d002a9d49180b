//! Trigger event delivered by the edge platform.
//!
//! Mirrors the CloudFront origin-request shape. Only the fields the pipeline
//! reads are modelled; everything else in the payload is ignored.

use serde::{Deserialize, Serialize};

/// Scheme used to reach the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginProtocol {
    Http,
    Https,
}

impl OriginProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            OriginProtocol::Http => "http",
            OriginProtocol::Https => "https",
        }
    }
}

impl std::fmt::Display for OriginProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Root of the trigger payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EdgeEvent {
    #[serde(rename = "Records")]
    pub records: Vec<EventRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EventRecord {
    pub cf: CloudFrontRecord,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CloudFrontRecord {
    pub request: ViewerRequest,
}

/// The viewer request as seen by the origin-request trigger.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ViewerRequest {
    /// Request path, e.g. `/photos/cat.png`.
    pub uri: String,

    /// Raw query string without the leading `?`.
    #[serde(default)]
    pub querystring: String,

    #[serde(default)]
    pub origin: Option<RequestOrigin>,
}

/// Origin attached to the request. Only custom (HTTP) origins are supported.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
pub struct RequestOrigin {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<CustomOrigin>,
}

/// Custom-origin descriptor: where the unmodified image lives.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomOrigin {
    pub protocol: OriginProtocol,
    pub domain_name: String,
    #[serde(default)]
    pub path: String,
}

impl EdgeEvent {
    /// Build a single-record event for a request against `origin`.
    pub fn for_request(
        origin: CustomOrigin,
        uri: impl Into<String>,
        querystring: impl Into<String>,
    ) -> Self {
        Self {
            records: vec![EventRecord {
                cf: CloudFrontRecord {
                    request: ViewerRequest {
                        uri: uri.into(),
                        querystring: querystring.into(),
                        origin: Some(RequestOrigin {
                            custom: Some(origin),
                        }),
                    },
                },
            }],
        }
    }

    /// The request carried by the first record, if any.
    pub fn request(&self) -> Option<&ViewerRequest> {
        self.records.first().map(|record| &record.cf.request)
    }
}
