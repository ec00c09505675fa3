//! Drives a whole run: harvest each target, fan its commits out, summarize.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info};

use crate::config::{ConfigError, RunConfig, RunTarget};
use crate::executor::{
    dependency_log_path, BatchReport, CommitExecutor, ExecutionMode, SharedSinks,
};
use crate::git::harvest_commits;
use crate::harvest::pipeline::CommitPipeline;
use crate::metadata::{MetadataStore, StoreError};
use crate::model::CommitRecord;
use crate::traits::VcsTool;

#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What a finished run reports.
#[derive(Debug)]
pub struct RunSummary {
    pub report: BatchReport,
    /// Entries found in the repository's artifact directory afterwards
    pub artifact_count: usize,
    pub artifact_dir: PathBuf,
    pub elapsed: Duration,
}

pub struct Orchestrator<'a> {
    config: &'a RunConfig,
    vcs: Arc<dyn VcsTool>,
    store: Arc<MetadataStore>,
    executor: CommitExecutor,
}

impl<'a> Orchestrator<'a> {
    /// Orchestrator printing progress to stdout.
    pub fn new(config: &'a RunConfig, vcs: Arc<dyn VcsTool>, store: Arc<MetadataStore>) -> Self {
        Self::with_console(config, vcs, store, Box::new(std::io::stdout()))
    }

    pub fn with_console(
        config: &'a RunConfig,
        vcs: Arc<dyn VcsTool>,
        store: Arc<MetadataStore>,
        console: Box<dyn Write + Send>,
    ) -> Self {
        let mode = ExecutionMode::select(config.debug, config.workers);
        let sinks = SharedSinks::new(
            dependency_log_path(&config.output_root, &config.repo_name),
            console,
        );
        Self {
            config,
            vcs,
            store,
            executor: CommitExecutor::new(mode, sinks),
        }
    }

    pub async fn run(&self) -> Result<RunSummary, RunError> {
        let started = Instant::now();
        let config = self.config;
        let console = self.executor.sinks();

        console.console_line(&format!("Retrieving CVE patch from {}", config.repo_name));
        console.console_line(&format!(
            "Multi-repo mode: {}",
            if config.is_aggregate() { "ON." } else { "OFF." }
        ));

        let artifact_dir = config.artifact_dir();
        std::fs::create_dir_all(&artifact_dir).map_err(|source| RunError::OutputDir {
            path: artifact_dir.clone(),
            source,
        })?;
        info!(
            repo = %config.repo_name,
            output = %artifact_dir.display(),
            mode = ?self.executor.mode(),
            "Initialized"
        );

        let mut report = BatchReport::default();
        match &config.target {
            RunTarget::Single => {
                let repo_dir = config.repo_dir(None);
                let commits = self.harvest(&repo_dir).await;
                report.merge(self.process(&repo_dir, commits, None).await);
            }
            RunTarget::Aggregate(sub_repos) => {
                for (idx, sub_repo) in sub_repos.iter().enumerate() {
                    let repo_dir = config.repo_dir(Some(sub_repo.as_str()));
                    let commits = self.harvest(&repo_dir).await;
                    console.console_line(&format!("{}/{}", idx + 1, sub_repos.len()));
                    if !commits.is_empty() {
                        report.merge(
                            self.process(&repo_dir, commits, Some(sub_repo.clone()))
                                .await,
                        );
                    }
                }
            }
        }

        let artifact_count = std::fs::read_dir(&artifact_dir)
            .map(|entries| entries.count())
            .unwrap_or(0);
        let elapsed = started.elapsed();

        console.console_line(&format!(
            "{} patches saved in {}",
            artifact_count,
            artifact_dir.display()
        ));
        console.console_line(&format!("Done. ({:.3} sec)", elapsed.as_secs_f64()));

        Ok(RunSummary {
            report,
            artifact_count,
            artifact_dir,
            elapsed,
        })
    }

    async fn harvest(&self, repo_dir: &Path) -> Vec<CommitRecord> {
        let vcs = Arc::clone(&self.vcs);
        let dir = repo_dir.to_path_buf();
        match tokio::task::spawn_blocking(move || harvest_commits(vcs.as_ref(), &dir)).await {
            Ok(commits) => commits,
            Err(e) => {
                error!(repo = %repo_dir.display(), error = %e, "Harvest task failed");
                Vec::new()
            }
        }
    }

    async fn process(
        &self,
        repo_dir: &Path,
        commits: Vec<CommitRecord>,
        sub_repo: Option<String>,
    ) -> BatchReport {
        let line = format!(
            "{} commits in {} {}",
            commits.len(),
            self.config.repo_name,
            sub_repo.as_deref().unwrap_or("")
        );
        self.executor.sinks().console_line(line.trim_end());

        let pipeline = Arc::new(CommitPipeline::new(
            Arc::clone(&self.vcs),
            Arc::clone(&self.store),
            repo_dir,
            &self.config.artifact_dir(),
            sub_repo,
        ));
        self.executor.execute(pipeline, commits).await
    }
}
