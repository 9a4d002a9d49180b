//! Origin header sanitization.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers the CDN refuses in a generated response
//! - Strip CDN/edge-internal and proxy-forwarding headers
//! - Reshape survivors into the `lowercase name → [{key, value}]` mapping
//!
//! # Design Decisions
//! - Blacklist is a static table of exact and prefix rules
//! - Matching is ASCII case-insensitive
//! - Output is ordered by name so identical input yields identical output

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::edge::response::HeaderEntry;
use crate::pipeline::fetcher::OriginHeader;

/// A single blacklist rule, matched against the lower-cased header name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderRule {
    Exact(&'static str),
    Prefix(&'static str),
}

impl HeaderRule {
    fn matches(&self, lowercase_name: &str) -> bool {
        match self {
            HeaderRule::Exact(name) => lowercase_name == *name,
            HeaderRule::Prefix(prefix) => lowercase_name.starts_with(prefix),
        }
    }
}

/// Headers the CDN does not allow in a response generated at the edge.
pub const BLACKLIST: &[HeaderRule] = &[
    HeaderRule::Exact("connection"),
    HeaderRule::Exact("content-length"),
    HeaderRule::Exact("expect"),
    HeaderRule::Exact("keep-alive"),
    HeaderRule::Exact("proxy-authenticate"),
    HeaderRule::Exact("proxy-authorization"),
    HeaderRule::Exact("proxy-connection"),
    HeaderRule::Exact("trailer"),
    HeaderRule::Exact("upgrade"),
    HeaderRule::Prefix("x-accel-"),
    HeaderRule::Prefix("x-amz-cf-"),
    HeaderRule::Prefix("x-amzn-"),
    HeaderRule::Prefix("x-cache"),
    HeaderRule::Prefix("x-edge-"),
    HeaderRule::Prefix("x-forwarded-proto"),
    HeaderRule::Exact("x-real-ip"),
];

/// Whether `name` is dropped by the sanitizer.
pub fn is_blacklisted(name: &str) -> bool {
    let lowercase = name.to_ascii_lowercase();
    BLACKLIST.iter().any(|rule| rule.matches(&lowercase))
}

/// Origin headers permitted in the edge response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct SanitizedHeaders(BTreeMap<String, Vec<HeaderEntry>>);

impl SanitizedHeaders {
    /// Filter and reshape raw origin headers.
    ///
    /// Each surviving header becomes exactly one entry; a later duplicate of
    /// the same name (ignoring case) replaces an earlier one.
    pub fn from_origin(headers: &[OriginHeader]) -> Self {
        let map = headers
            .iter()
            .filter(|header| !is_blacklisted(&header.name))
            .map(|header| {
                (
                    header.name.to_ascii_lowercase(),
                    vec![HeaderEntry {
                        key: header.name.clone(),
                        value: header.value.clone(),
                    }],
                )
            })
            .collect();
        Self(map)
    }

    /// Entry for `name`, looked up case-insensitively.
    pub fn get(&self, name: &str) -> Option<&HeaderEntry> {
        self.0
            .get(&name.to_ascii_lowercase())
            .and_then(|entries| entries.first())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All emitted entries in name order.
    pub fn entries(&self) -> impl Iterator<Item = &HeaderEntry> {
        self.0.values().flatten()
    }
}
