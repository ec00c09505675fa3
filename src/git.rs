//! Git subprocess adapter and commit harvesting.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;
use tracing::{debug, error};

use crate::model::CommitRecord;
use crate::traits::{ToolError, VcsTool};

/// Text every harvested commit message must contain.
pub const CVE_GREP_PATTERN: &str = "CVE-20";

const RECORD_BOUNDARY: &str = r"\ncommit [0-9a-fA-F]{40}\n(?:Author|Merge):\s";

static RECORD_BOUNDARY_RE: OnceLock<Regex> = OnceLock::new();

/// Record boundary matcher, compiled on first use.
fn record_boundary() -> &'static Regex {
    RECORD_BOUNDARY_RE
        .get_or_init(|| Regex::new(RECORD_BOUNDARY).expect("record boundary pattern is valid"))
}

/// [`VcsTool`] backed by the `git` command line.
#[derive(Debug, Clone)]
pub struct GitCli {
    binary: PathBuf,
}

impl GitCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn run(&self, repo_dir: &Path, args: &[&str]) -> Result<Vec<u8>, ToolError> {
        let command = format!("{} {}", self.binary.display(), args.join(" "));
        debug!(repo = %repo_dir.display(), %command, "Running git");

        let output = Command::new(&self.binary)
            .args(args)
            .current_dir(repo_dir)
            .output()
            .map_err(|source| ToolError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ToolError::Failed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}

impl VcsTool for GitCli {
    fn log(&self, repo_dir: &Path, pattern: &str) -> Result<String, ToolError> {
        let grep = format!("--grep={}", pattern);
        let stdout = self.run(
            repo_dir,
            &[
                "--no-pager",
                "log",
                "--all",
                "--pretty=fuller",
                "--no-decorate",
                &grep,
            ],
        )?;
        String::from_utf8(stdout).map_err(|_| ToolError::Decode {
            command: format!("{} log", self.binary.display()),
        })
    }

    fn show(&self, repo_dir: &Path, commit_hash: &str) -> Result<Vec<u8>, ToolError> {
        self.run(
            repo_dir,
            &["--no-pager", "show", "--pretty=fuller", commit_hash],
        )
    }
}

/// Splits `git log --pretty=fuller` output into one record per commit.
///
/// A record starts at a `commit <40 hex>` line directly followed by an
/// `Author:` or `Merge:` line. The newline before each boundary is dropped.
pub fn split_commit_records(log_output: &str) -> Vec<CommitRecord> {
    if log_output.trim().is_empty() {
        return Vec::new();
    }

    let boundary = record_boundary();
    let mut records = Vec::new();
    let mut start = 0;
    for m in boundary.find_iter(log_output) {
        records.push(CommitRecord::new(&log_output[start..m.start()]));
        // skip the newline that separates the records
        start = m.start() + 1;
    }
    records.push(CommitRecord::new(&log_output[start..]));
    records
}

/// Lists CVE-referencing commits of one working copy.
///
/// A failed or undecodable `log` is reported and yields no records, so the
/// caller can carry on with the next repository.
pub fn harvest_commits(vcs: &dyn VcsTool, repo_dir: &Path) -> Vec<CommitRecord> {
    match vcs.log(repo_dir, CVE_GREP_PATTERN) {
        Ok(output) => split_commit_records(&output),
        Err(e) => {
            error!(repo = %repo_dir.display(), error = %e, "[-] Git log error");
            Vec::new()
        }
    }
}
