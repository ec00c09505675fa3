//! Stage abstraction and error types for the per-commit harvest pipeline.
//!
//! Every step a commit record passes through (classification, identifier
//! resolution, metadata enrichment, archiving) implements [`HarvestStage`].

use std::path::PathBuf;
use thiserror::Error;

use crate::traits::ToolError;

// ============================================================================
// Pipeline Trait
// ============================================================================

/// Generic pipeline stage that transforms Input → Output.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`: one stage instance is shared by
/// every worker processing commits of the same repository.
///
/// # Examples
///
/// ```ignore
/// struct Upper;
///
/// impl HarvestStage for Upper {
///     type Input = String;
///     type Output = String;
///     type Error = std::convert::Infallible;
///
///     fn execute(&self, input: Self::Input) -> Result<Self::Output, Self::Error> {
///         Ok(input.to_uppercase())
///     }
///
///     fn stage_name(&self) -> &'static str {
///         "upper"
///     }
/// }
/// ```
pub trait HarvestStage: Send + Sync {
    /// Input type consumed by this stage
    type Input;

    /// Output type produced by this stage
    type Output;

    /// Error type for stage failures
    type Error: std::error::Error + Send + Sync + 'static;

    /// Executes the stage.
    ///
    /// # Idempotence
    ///
    /// Stages are idempotent: running one twice on the same input yields the
    /// same output (the archiver overwrites its artifact).
    fn execute(&self, input: Self::Input) -> Result<Self::Output, Self::Error>;

    /// Returns a human-readable name for this stage, used in log fields.
    fn stage_name(&self) -> &'static str;
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while archiving one commit.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// `git show` failed for the commit
    #[error("Writing {file} Error: {source}")]
    Show {
        file: String,
        #[source]
        source: ToolError,
    },

    /// Artifact could not be written
    #[error("Writing {file} Error: {source}")]
    Write {
        file: String,
        #[source]
        source: std::io::Error,
    },
}

impl ArchiveError {
    /// Artifact filename the failure refers to.
    pub fn file(&self) -> &str {
        match self {
            ArchiveError::Show { file, .. } | ArchiveError::Write { file, .. } => file,
        }
    }
}

/// Errors that can occur while running the pipeline for one commit.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Archive stage failed
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Dependency log could not be appended
    #[error("Failed to append dependency log {path}: {source}")]
    DependencyLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Worker task panicked or was cancelled
    #[error("Worker failed: {0}")]
    Worker(String),
}

// ============================================================================
// Tests
// ============================================================================
