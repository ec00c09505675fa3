//! Writes the `git show` output of a fix commit to its `.diff` artifact.

use std::path::PathBuf;
use std::sync::Arc;

use crate::harvest::traits::{ArchiveError, HarvestStage};
use crate::model::ArtifactPrefix;
use crate::traits::VcsTool;

#[derive(Debug, Clone)]
pub struct ArchiveRequest {
    pub commit_hash: String,
    pub prefix: ArtifactPrefix,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactWritten {
    pub file_name: String,
    pub path: PathBuf,
    /// Bytes written, sub-repository line included
    pub bytes: usize,
}

/// Archiver bound to one working copy and one output directory.
pub struct DiffArchiver {
    vcs: Arc<dyn VcsTool>,
    repo_dir: PathBuf,
    output_dir: PathBuf,
    /// Set in aggregate mode; written as the first line of each artifact.
    sub_repo: Option<String>,
}

impl DiffArchiver {
    pub fn new(
        vcs: Arc<dyn VcsTool>,
        repo_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        sub_repo: Option<String>,
    ) -> Self {
        Self {
            vcs,
            repo_dir: repo_dir.into(),
            output_dir: output_dir.into(),
            sub_repo,
        }
    }

    pub fn archive(
        &self,
        commit_hash: &str,
        prefix: &ArtifactPrefix,
    ) -> Result<ArtifactWritten, ArchiveError> {
        let file_name = prefix.file_name(commit_hash);

        let patch = self
            .vcs
            .show(&self.repo_dir, commit_hash)
            .map_err(|source| ArchiveError::Show {
                file: file_name.clone(),
                source,
            })?;

        let mut content = Vec::with_capacity(patch.len() + 64);
        if let Some(sub_repo) = &self.sub_repo {
            content.extend_from_slice(sub_repo.as_bytes());
            content.push(b'\n');
        }
        content.extend_from_slice(&patch);

        let path = self.output_dir.join(&file_name);
        std::fs::write(&path, &content).map_err(|source| ArchiveError::Write {
            file: file_name.clone(),
            source,
        })?;

        Ok(ArtifactWritten {
            file_name,
            path,
            bytes: content.len(),
        })
    }
}

impl HarvestStage for DiffArchiver {
    type Input = ArchiveRequest;
    type Output = ArtifactWritten;
    type Error = ArchiveError;

    fn execute(&self, input: Self::Input) -> Result<Self::Output, Self::Error> {
        self.archive(&input.commit_hash, &input.prefix)
    }

    fn stage_name(&self) -> &'static str {
        "archive"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use crate::model::SeverityMetadata;
    use crate::traits::ToolError;

    const HASH: &str = "2e9466c84e5beee964e1898dd1f37c3509fa8853";

    struct FixedShow(Vec<u8>);

    impl VcsTool for FixedShow {
        fn log(&self, _repo_dir: &Path, _pattern: &str) -> Result<String, ToolError> {
            Ok(String::new())
        }

        fn show(&self, _repo_dir: &Path, _commit_hash: &str) -> Result<Vec<u8>, ToolError> {
            Ok(self.0.clone())
        }
    }

    fn prefix() -> ArtifactPrefix {
        ArtifactPrefix::new(
            "CVE-2014-6416",
            &SeverityMetadata {
                score: "7.5".to_string(),
                weakness_class: "CWE-089".to_string(),
            },
        )
    }

    #[test]
    fn test_archive_writes_show_output() {
        let out = tempfile::tempdir().unwrap();
        let archiver = DiffArchiver::new(
            Arc::new(FixedShow(b"commit x\n\ndiff --git a b\n".to_vec())),
            "/repo",
            out.path(),
            None,
        );

        let written = archiver.archive(HASH, &prefix()).unwrap();
        assert_eq!(written.bytes, b"commit x\n\ndiff --git a b\n".len());
        assert_eq!(
            written.file_name,
            format!("CVE-2014-6416_7.5_CWE-089_{}.diff", HASH)
        );
        assert_eq!(
            std::fs::read(&written.path).unwrap(),
            b"commit x\n\ndiff --git a b\n"
        );
    }

    #[test]
    fn test_aggregate_mode_prepends_sub_repository() {
        let out = tempfile::tempdir().unwrap();
        let archiver = DiffArchiver::new(
            Arc::new(FixedShow(b"patch".to_vec())),
            "/repo/platform/bionic",
            out.path(),
            Some("platform/bionic".to_string()),
        );

        let written = archiver
            .execute(ArchiveRequest {
                commit_hash: HASH.to_string(),
                prefix: prefix(),
            })
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(&written.path).unwrap(),
            "platform/bionic\npatch"
        );
        assert_eq!(written.bytes, "platform/bionic\npatch".len());
    }

    #[test]
    fn test_write_failure_names_the_artifact() {
        let out = tempfile::tempdir().unwrap();
        let archiver = DiffArchiver::new(
            Arc::new(FixedShow(b"patch".to_vec())),
            "/repo",
            out.path().join("missing-dir"),
            None,
        );

        let err = archiver.archive(HASH, &prefix()).unwrap_err();
        assert!(matches!(err, ArchiveError::Write { .. }));
        assert_eq!(err.file(), prefix().file_name(HASH));
    }
}
