//! Per-commit harvest pipeline.
//!
//! [`CommitPipeline`] runs one commit record through the stages
//! Classifier → Resolver → Enricher → Archiver. It is stateless across
//! commits; the only shared outputs (dependency log, console) come in through
//! [`SharedSinks`], owned by the coordinator.

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::executor::SharedSinks;
use crate::harvest::archive::{ArchiveRequest, ArtifactWritten, DiffArchiver};
use crate::harvest::classify::{Classification, CommitClassifier};
use crate::harvest::enrich::MetadataEnricher;
use crate::harvest::identifiers::{IdentifierResolver, Unresolved};
use crate::harvest::traits::{HarvestStage, PipelineError};
use crate::metadata::MetadataStore;
use crate::model::CommitRecord;
use crate::traits::VcsTool;

// ============================================================================
// Pipeline Types
// ============================================================================

/// Why a commit produced no artifact without being an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Merge, revert or upgrade commit
    FalsePositive,
    /// No well-formed CVE identifier in the record
    NoIdentifier,
    /// Header lacks a 40-hex-digit commit hash
    MalformedHeader,
}

impl From<Unresolved> for SkipReason {
    fn from(value: Unresolved) -> Self {
        match value {
            Unresolved::MalformedHeader => SkipReason::MalformedHeader,
            Unresolved::NoIdentifier => SkipReason::NoIdentifier,
        }
    }
}

/// Result of running one commit through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Archived(ArtifactWritten),
    Skipped(SkipReason),
}

// ============================================================================
// Pipeline Executor
// ============================================================================

/// Stage chain for the commits of one working copy.
///
/// # Thread Safety
///
/// `Send + Sync`; a single instance behind an `Arc` serves every worker.
pub struct CommitPipeline {
    classifier: CommitClassifier,
    resolver: IdentifierResolver,
    enricher: MetadataEnricher,
    archiver: DiffArchiver,
}

impl CommitPipeline {
    /// # Arguments
    ///
    /// * `vcs` - tool used for `show`
    /// * `store` - shared metadata table
    /// * `repo_dir` - working copy the commits come from
    /// * `output_dir` - directory receiving the `.diff` artifacts
    /// * `sub_repo` - sub-repository name in aggregate mode
    pub fn new(
        vcs: Arc<dyn VcsTool>,
        store: Arc<MetadataStore>,
        repo_dir: &Path,
        output_dir: &Path,
        sub_repo: Option<String>,
    ) -> Self {
        Self {
            classifier: CommitClassifier::new(),
            resolver: IdentifierResolver::new(),
            enricher: MetadataEnricher::new(store),
            archiver: DiffArchiver::new(vcs, repo_dir, output_dir, sub_repo),
        }
    }

    /// Processes one commit record.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the dependency log cannot be appended or
    /// the artifact cannot be produced. Skipped commits are not errors.
    pub fn process(
        &self,
        record: CommitRecord,
        sinks: &SharedSinks,
    ) -> Result<CommitOutcome, PipelineError> {
        let record = match infallible(self.classifier.execute(record)) {
            Classification::Candidate(record) => record,
            Classification::FalsePositive(record) => {
                debug!(
                    stage = self.classifier.stage_name(),
                    hash = record.hash().unwrap_or("?"),
                    "Skipping false positive"
                );
                return Ok(CommitOutcome::Skipped(SkipReason::FalsePositive));
            }
        };

        let resolution = match self.resolver.execute(record) {
            Ok(resolution) => resolution,
            Err(reason) => {
                debug!(stage = self.resolver.stage_name(), %reason, "Skipping commit");
                return Ok(CommitOutcome::Skipped(reason.into()));
            }
        };

        if let Some(dependency) = resolution.dependency_record() {
            sinks.append_dependency(&dependency)?;
        }

        let prefix = infallible(self.enricher.execute(resolution.canonical));

        match self.archiver.execute(ArchiveRequest {
            commit_hash: resolution.commit_hash,
            prefix,
        }) {
            Ok(written) => {
                debug!(
                    stage = self.archiver.stage_name(),
                    file = %written.file_name,
                    bytes = written.bytes,
                    "Artifact written"
                );
                sinks.console_line(&format!("[+] Writing {} Done.", written.file_name));
                Ok(CommitOutcome::Archived(written))
            }
            Err(e) => {
                warn!(stage = self.archiver.stage_name(), file = e.file(), error = %e, "Archive failed");
                sinks.console_line(&format!("[+] {}", e));
                Err(e.into())
            }
        }
    }
}

fn infallible<T>(result: Result<T, std::convert::Infallible>) -> T {
    match result {
        Ok(value) => value,
        Err(never) => match never {},
    }
}

// ============================================================================
// Tests
// ============================================================================
