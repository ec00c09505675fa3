use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument};

use crate::harvest::pipeline::{CommitOutcome, CommitPipeline, SkipReason};
use crate::harvest::traits::PipelineError;
use crate::model::{CommitRecord, DependencyRecord};

/// Outputs shared by every worker of a run.
///
/// Each sink sits behind its own mutex; the guard is dropped on every exit
/// path, so a failing worker never leaves a sink locked.
pub struct SharedSinks {
    dependency_log: Mutex<PathBuf>,
    console: Mutex<Box<dyn Write + Send>>,
}

impl SharedSinks {
    pub fn new(dependency_log: impl Into<PathBuf>, console: Box<dyn Write + Send>) -> Self {
        Self {
            dependency_log: Mutex::new(dependency_log.into()),
            console: Mutex::new(console),
        }
    }

    /// Appends one line to the dependency log.
    pub fn append_dependency(&self, record: &DependencyRecord) -> Result<(), PipelineError> {
        let path = lock(&self.dependency_log);
        let line = format!("{}\n", record);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&*path)
            .and_then(|mut file| file.write_all(line.as_bytes()))
            .map_err(|source| PipelineError::DependencyLog {
                path: path.clone(),
                source,
            })
    }

    /// Writes one whole line to the console. Console errors are ignored.
    pub fn console_line(&self, line: &str) {
        let mut console = lock(&self.console);
        let _ = writeln!(console, "{}", line);
        let _ = console.flush();
    }

    pub fn dependency_log_path(&self) -> PathBuf {
        lock(&self.dependency_log).clone()
    }
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking worker cannot leave a half-written line behind, so a
    // poisoned sink is still usable.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// How commits of one repository are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// One commit at a time, in input order.
    Sequential,
    /// Up to `workers` commits in flight on the blocking pool.
    Parallel { workers: usize },
}

impl ExecutionMode {
    /// Sequential under debug or on Windows, otherwise one worker per CPU
    /// unless `workers` overrides it.
    pub fn select(debug: bool, workers: Option<usize>) -> Self {
        if debug || cfg!(windows) {
            ExecutionMode::Sequential
        } else {
            ExecutionMode::Parallel {
                workers: workers.unwrap_or_else(num_cpus::get).max(1),
            }
        }
    }
}

/// Tally of commit outcomes for one or more batches.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// File names of the artifacts written
    pub artifacts: Vec<String>,
    pub false_positives: usize,
    pub no_identifier: usize,
    pub malformed: usize,
    pub failures: Vec<PipelineError>,
}

impl BatchReport {
    pub fn record(&mut self, result: Result<CommitOutcome, PipelineError>) {
        match result {
            Ok(CommitOutcome::Archived(written)) => self.artifacts.push(written.file_name),
            Ok(CommitOutcome::Skipped(SkipReason::FalsePositive)) => self.false_positives += 1,
            Ok(CommitOutcome::Skipped(SkipReason::NoIdentifier)) => self.no_identifier += 1,
            Ok(CommitOutcome::Skipped(SkipReason::MalformedHeader)) => self.malformed += 1,
            Err(e) => self.failures.push(e),
        }
    }

    pub fn merge(&mut self, other: BatchReport) {
        self.artifacts.extend(other.artifacts);
        self.false_positives += other.false_positives;
        self.no_identifier += other.no_identifier;
        self.malformed += other.malformed;
        self.failures.extend(other.failures);
    }

    pub fn processed(&self) -> usize {
        self.artifacts.len()
            + self.false_positives
            + self.no_identifier
            + self.malformed
            + self.failures.len()
    }
}

/// Fans commit records out to the per-commit pipeline.
pub struct CommitExecutor {
    mode: ExecutionMode,
    semaphore: Arc<Semaphore>,
    sinks: Arc<SharedSinks>,
}

impl CommitExecutor {
    pub fn new(mode: ExecutionMode, sinks: SharedSinks) -> Self {
        let permits = match mode {
            ExecutionMode::Sequential => 1,
            ExecutionMode::Parallel { workers } => workers.max(1),
        };
        Self {
            mode,
            semaphore: Arc::new(Semaphore::new(permits)),
            sinks: Arc::new(sinks),
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn sinks(&self) -> &SharedSinks {
        &self.sinks
    }

    pub fn dependency_log(&self) -> PathBuf {
        self.sinks.dependency_log_path()
    }

    /// Runs every record through `pipeline` and waits for all of them.
    #[instrument(skip_all, fields(commits = records.len(), mode = ?self.mode))]
    pub async fn execute(
        &self,
        pipeline: Arc<CommitPipeline>,
        records: Vec<CommitRecord>,
    ) -> BatchReport {
        info!("Starting commit batch");
        let report = match self.mode {
            ExecutionMode::Sequential => self.execute_sequential(pipeline, records).await,
            ExecutionMode::Parallel { .. } => self.execute_parallel(pipeline, records).await,
        };
        info!(
            artifacts = report.artifacts.len(),
            false_positives = report.false_positives,
            no_identifier = report.no_identifier,
            failures = report.failures.len(),
            "Finished commit batch"
        );
        report
    }

    async fn execute_sequential(
        &self,
        pipeline: Arc<CommitPipeline>,
        records: Vec<CommitRecord>,
    ) -> BatchReport {
        let mut report = BatchReport::default();
        for record in records {
            let pipeline = Arc::clone(&pipeline);
            let sinks = Arc::clone(&self.sinks);
            let joined =
                tokio::task::spawn_blocking(move || pipeline.process(record, &sinks)).await;
            report.record(flatten(joined));
        }
        report
    }

    async fn execute_parallel(
        &self,
        pipeline: Arc<CommitPipeline>,
        records: Vec<CommitRecord>,
    ) -> BatchReport {
        let mut report = BatchReport::default();
        let mut tasks = JoinSet::new();

        for record in records {
            let permit = match Arc::clone(&self.semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    report.record(Err(PipelineError::Worker(format!("Semaphore error: {}", e))));
                    continue;
                }
            };
            let pipeline = Arc::clone(&pipeline);
            let sinks = Arc::clone(&self.sinks);
            tasks.spawn_blocking(move || {
                let _permit = permit;
                pipeline.process(record, &sinks)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            report.record(flatten(joined));
        }
        debug!(processed = report.processed(), "All workers joined");
        report
    }
}

fn flatten(
    joined: Result<Result<CommitOutcome, PipelineError>, tokio::task::JoinError>,
) -> Result<CommitOutcome, PipelineError> {
    joined.unwrap_or_else(|e| Err(PipelineError::Worker(e.to_string())))
}

/// Dependency log location for a repository: `<output_root>/dependency_<repo>`.
pub fn dependency_log_path(output_root: &Path, repo_name: &str) -> PathBuf {
    output_root.join(format!("dependency_{}", repo_name))
}
