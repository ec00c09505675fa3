use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{command}' exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("'{command}' produced output that is not valid UTF-8")]
    Decode { command: String },
}

/// External version-control tool used by the harvester and archiver.
///
/// Both calls block until the subprocess exits. Implementations must be
/// shareable across worker threads.
pub trait VcsTool: Send + Sync {
    /// Full-format log of every commit whose message mentions `pattern`.
    fn log(&self, repo_dir: &Path, pattern: &str) -> Result<String, ToolError>;

    /// Patch text (metadata header plus unified diff) of one commit, verbatim.
    fn show(&self, repo_dir: &Path, commit_hash: &str) -> Result<Vec<u8>, ToolError>;
}
