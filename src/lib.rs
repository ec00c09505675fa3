pub mod config;
pub mod executor;
pub mod git;
pub mod harvest;
pub mod metadata;
pub mod model;
pub mod orchestrator;
pub mod traits;

// Re-export common types for convenience
pub use config::{ConfigError, RunConfig, RunTarget, Settings};
pub use executor::{BatchReport, CommitExecutor, ExecutionMode, SharedSinks};
pub use git::{harvest_commits, split_commit_records, GitCli};
pub use metadata::{MetadataStore, StoreError};
pub use model::*;
pub use orchestrator::{Orchestrator, RunError, RunSummary};
pub use traits::*;
