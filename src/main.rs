//! # `cvepatch`
//!
//! Collects CVE fix commits from a local clone and saves each one as a
//! labeled `.diff` file.
//!
//! ```bash
//! # one repository under <git_storage_path>/linux
//! cvepatch linux
//!
//! # every sub-repository listed in <repolists_dir>/list_android
//! cvepatch android --multimode
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use cvepatch_harvester::{GitCli, MetadataStore, Orchestrator, RunConfig, Settings};

const DEFAULT_CONFIG: &str = "cvepatch.toml";

#[derive(Parser, Debug)]
#[command(
    name = "cvepatch",
    about = "Retrieve CVE patches from git history",
    version
)]
struct Cli {
    /// Repository name (directory under the git storage path)
    #[arg(value_name = "REPO")]
    repo: String,

    /// Treat REPO as a group of sub-repositories listed in `list_<REPO>`
    #[arg(short, long)]
    multimode: bool,

    /// Settings file (TOML). Defaults apply when the default file is absent.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Process commits one at a time
    #[arg(short, long, hide = true)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let log_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let (config_path, explicit) = match cli.config {
        Some(path) => (path, true),
        None => (PathBuf::from(DEFAULT_CONFIG), false),
    };
    let settings = Settings::load_or_default(&config_path, explicit)?;
    let config = RunConfig::new(&cli.repo, cli.multimode, cli.debug, settings)?;
    let store = Arc::new(MetadataStore::load(&config.metadata_path)?);
    let git = Arc::new(GitCli::new(&config.git_binary));

    let summary = Orchestrator::new(&config, git, store).run().await?;
    info!(
        artifacts = summary.artifact_count,
        written = summary.report.artifacts.len(),
        false_positives = summary.report.false_positives,
        failures = summary.report.failures.len(),
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "Run complete"
    );
    Ok(())
}
