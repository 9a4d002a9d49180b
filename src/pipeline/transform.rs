//! Raster transformation.
//!
//! # Responsibilities
//! - Describe the resize (`ResizeSpec`) handed to the external tool
//! - Run the tool against the scratch source, writing the scratch target
//! - Capture the tool's diagnostics for the log
//!
//! # Design Decisions
//! - Resize math is never done in-process; `Transformer` is the seam
//! - The `WxH>` geometry is ImageMagick's shrink-only qualifier
//! - Arguments are passed directly, never through a shell

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

/// Target box and output tuning for one transformation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeSpec {
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    /// Unsharp-mask amount, e.g. `0x1`. `None` skips the pass.
    pub sharpen: Option<String>,
}

impl ResizeSpec {
    /// Shrink-only bounding box: `{width}x{height}>`.
    pub fn geometry(&self) -> String {
        format!("{}x{}>", self.width, self.height)
    }
}

/// Inputs for one transformer call.
#[derive(Debug, Clone, Copy)]
pub struct TransformJob<'a> {
    pub source: &'a Path,
    pub target: &'a Path,
    pub spec: &'a ResizeSpec,
}

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited unsuccessfully (code {code:?})")]
    Failed {
        program: String,
        code: Option<i32>,
        /// Tool diagnostics, kept for the log only.
        stderr: String,
    },

    #[error("transformed image unreadable at {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TransformError {
    /// Captured tool diagnostics, if the tool ran.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            TransformError::Failed { stderr, .. } if !stderr.is_empty() => Some(stderr.as_str()),
            _ => None,
        }
    }
}

/// Turns the source image into the target image.
#[async_trait]
pub trait Transformer: Send + Sync {
    async fn transform(&self, job: &TransformJob<'_>) -> Result<(), TransformError>;
}

/// Runs an ImageMagick-compatible executable.
#[derive(Debug, Clone)]
pub struct CommandTransformer {
    program: PathBuf,
}

impl CommandTransformer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// `<source> -resize WxH> -quality Q [-sharpen A] <target>`
    pub fn arguments(job: &TransformJob<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            job.source.into(),
            "-resize".into(),
            job.spec.geometry().into(),
            "-quality".into(),
            job.spec.quality.to_string().into(),
        ];
        if let Some(amount) = &job.spec.sharpen {
            args.push("-sharpen".into());
            args.push(amount.into());
        }
        args.push(job.target.into());
        args
    }
}

#[async_trait]
impl Transformer for CommandTransformer {
    async fn transform(&self, job: &TransformJob<'_>) -> Result<(), TransformError> {
        let program = self.program.display().to_string();
        tracing::debug!(
            program = %program,
            geometry = %job.spec.geometry(),
            quality = job.spec.quality,
            sharpen = ?job.spec.sharpen,
            "Running transformer"
        );

        let output = Command::new(&self.program)
            .args(Self::arguments(job))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| TransformError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(TransformError::Failed {
                program,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}
