//! Harvest module - per-commit extraction pipeline.
//!
//! - **Traits**: [`HarvestStage`] for composing the pipeline
//! - **Stages**: classification, identifier resolution, enrichment, archiving
//! - **Errors**: [`ArchiveError`], [`PipelineError`]
//! - **Pipeline**: [`pipeline::CommitPipeline`]

pub mod archive;
pub mod classify;
pub mod enrich;
pub mod identifiers;
pub mod pipeline;
pub mod traits;

// Re-export commonly used types
pub use traits::{ArchiveError, HarvestStage, PipelineError};

pub use archive::{ArchiveRequest, ArtifactWritten, DiffArchiver};
pub use classify::{Classification, CommitClassifier};
pub use enrich::{normalize_weakness_class, MetadataEnricher};
pub use identifiers::{IdentifierResolver, Resolution, Unresolved};
pub use pipeline::{CommitOutcome, CommitPipeline, SkipReason};
