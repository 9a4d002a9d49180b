//! Request interpretation.
//!
//! # Responsibilities
//! - Pull the custom origin and resource path out of the trigger
//! - Parse `width`/`height` from the query string
//! - Validate and clamp dimensions before any I/O happens
//!
//! # Design Decisions
//! - Absent or empty dimensions default to the ceiling
//! - A dimension is valid only as a decimal integer ≥ 1 given at most once
//! - Oversized integers (even beyond `u64`) clamp rather than fail

use thiserror::Error;

use crate::edge::event::{CustomOrigin, EdgeEvent};

/// Dimension handling knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionPolicy {
    /// Ceiling and default for both dimensions.
    pub max_dimension: u32,
    /// Fail with `InvalidDimension` instead of treating bad input as absent.
    pub reject_invalid: bool,
}

/// Interpreted request before clamping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformRequest {
    pub origin: CustomOrigin,
    pub resource_path: String,
    pub requested_width: Option<u64>,
    pub requested_height: Option<u64>,
}

impl TransformRequest {
    /// `{protocol}://{host}{base path}{resource path}`, concatenated verbatim.
    pub fn origin_url(&self) -> String {
        format!(
            "{}://{}{}{}",
            self.origin.protocol, self.origin.domain_name, self.origin.path, self.resource_path
        )
    }
}

/// Output of interpretation: the request plus clamped dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpretation {
    pub request: TransformRequest,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InterpretError {
    #[error("invalid {param} value '{value}'")]
    InvalidDimension { param: &'static str, value: String },

    #[error("trigger event contains no records")]
    NoRecords,

    #[error("request has no custom origin")]
    MissingOrigin,
}

/// Interpret a trigger event under `policy`.
pub fn interpret(event: &EdgeEvent, policy: &DimensionPolicy) -> Result<Interpretation, InterpretError> {
    let request = event.request().ok_or(InterpretError::NoRecords)?;
    let origin = request
        .origin
        .as_ref()
        .and_then(|origin| origin.custom.clone())
        .ok_or(InterpretError::MissingOrigin)?;

    let query = DimensionQuery::parse(&request.querystring);
    let requested_width = resolve("width", query.width, policy)?;
    let requested_height = resolve("height", query.height, policy)?;

    Ok(Interpretation {
        width: clamp(requested_width, policy.max_dimension),
        height: clamp(requested_height, policy.max_dimension),
        request: TransformRequest {
            origin,
            resource_path: request.uri.clone(),
            requested_width,
            requested_height,
        },
    })
}

/// `min(requested or max, max)`.
pub fn clamp(requested: Option<u64>, max_dimension: u32) -> u32 {
    match requested {
        Some(value) if value < u64::from(max_dimension) => value as u32,
        _ => max_dimension,
    }
}

#[derive(Debug, Default)]
struct DimensionQuery {
    width: RawParam,
    height: RawParam,
}

#[derive(Debug, Default)]
enum RawParam {
    #[default]
    Absent,
    Once(String),
    Repeated(String),
}

impl RawParam {
    fn push(&mut self, value: String) {
        *self = match std::mem::take(self) {
            RawParam::Absent => RawParam::Once(value),
            RawParam::Once(first) | RawParam::Repeated(first) => {
                RawParam::Repeated(format!("{},{}", first, value))
            }
        };
    }
}

impl DimensionQuery {
    fn parse(querystring: &str) -> Self {
        let mut query = Self::default();
        for (key, value) in url::form_urlencoded::parse(querystring.as_bytes()) {
            match key.as_ref() {
                "width" => query.width.push(value.into_owned()),
                "height" => query.height.push(value.into_owned()),
                _ => {}
            }
        }
        query
    }
}

fn resolve(
    param: &'static str,
    raw: RawParam,
    policy: &DimensionPolicy,
) -> Result<Option<u64>, InterpretError> {
    let parsed = match &raw {
        RawParam::Absent => Ok(None),
        RawParam::Once(value) => parse_dimension(value),
        RawParam::Repeated(_) => Err(()),
    };

    match parsed {
        Ok(value) => Ok(value),
        Err(()) if policy.reject_invalid => Err(InterpretError::InvalidDimension {
            param,
            value: match raw {
                RawParam::Once(value) | RawParam::Repeated(value) => value,
                RawParam::Absent => String::new(),
            },
        }),
        Err(()) => {
            tracing::debug!(param, "Ignoring invalid dimension, using ceiling");
            Ok(None)
        }
    }
}

fn parse_dimension(raw: &str) -> Result<Option<u64>, ()> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(());
    }
    // All digits, so a parse failure can only be overflow.
    let value = trimmed.parse::<u64>().unwrap_or(u64::MAX);
    if value == 0 {
        return Err(());
    }
    Ok(Some(value))
}
