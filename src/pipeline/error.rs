//! Pipeline failure taxonomy and its caller-visible mapping.

use thiserror::Error;

use crate::edge::response::EdgeResponse;
use crate::pipeline::fetcher::FetchError;
use crate::pipeline::interpreter::InterpretError;
use crate::pipeline::transform::TransformError;

/// Terminal failure of one invocation.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Interpret(#[from] InterpretError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to allocate scratch space: {0}")]
    Scratch(#[source] std::io::Error),

    #[error(transparent)]
    Transform(#[from] TransformError),
}

/// Coarse classification, one per caller-visible outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    MissingOrigin,
    OriginFetch,
    OriginWrite,
    Transform,
    TransformOutput,
}

impl ErrorKind {
    pub fn status(self) -> u16 {
        match self {
            ErrorKind::InvalidInput => 400,
            ErrorKind::MissingOrigin => 502,
            ErrorKind::OriginFetch
            | ErrorKind::OriginWrite
            | ErrorKind::Transform
            | ErrorKind::TransformOutput => 500,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "Invalid input",
            ErrorKind::MissingOrigin => "Origin not configured",
            ErrorKind::OriginFetch => "Error downloading the image",
            ErrorKind::OriginWrite => "Error writing the image to a file",
            ErrorKind::Transform => "Error resizing image",
            ErrorKind::TransformOutput => "Error reading the resized image",
        }
    }

    /// Label used for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::MissingOrigin => "missing_origin",
            ErrorKind::OriginFetch => "origin_fetch",
            ErrorKind::OriginWrite => "origin_write",
            ErrorKind::Transform => "transform",
            ErrorKind::TransformOutput => "transform_output",
        }
    }
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Interpret(InterpretError::InvalidDimension { .. }) => ErrorKind::InvalidInput,
            PipelineError::Interpret(_) => ErrorKind::MissingOrigin,
            PipelineError::Fetch(e) if e.is_write() => ErrorKind::OriginWrite,
            PipelineError::Fetch(_) => ErrorKind::OriginFetch,
            PipelineError::Scratch(_) => ErrorKind::OriginWrite,
            PipelineError::Transform(TransformError::Output { .. }) => ErrorKind::TransformOutput,
            PipelineError::Transform(_) => ErrorKind::Transform,
        }
    }

    pub fn status(&self) -> u16 {
        self.kind().status()
    }

    pub fn description(&self) -> &'static str {
        self.kind().description()
    }

    /// The response the caller sees. Carries no error detail.
    pub fn to_response(&self) -> EdgeResponse {
        EdgeResponse::error(self.status(), self.description())
    }
}
