//! Run configuration.
//!
//! Settings come from an optional TOML file; the repository name and mode
//! flags come from the command line. Both are folded into one immutable
//! [`RunConfig`] at startup.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to read repository list {path}: {source}")]
    Roster {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Contents of the settings file. Every key is optional.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default = "default_git_binary")]
    pub git_binary: PathBuf,
    /// Directory holding the local clones
    #[serde(default = "default_git_storage_path")]
    pub git_storage_path: PathBuf,
    /// Directory receiving `<repo>/` artifact folders and dependency logs
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
    #[serde(default = "default_metadata_path")]
    pub metadata_path: PathBuf,
    /// Directory holding `list_<repo>` roster files
    #[serde(default = "default_repolists_dir")]
    pub repolists_dir: PathBuf,
    #[serde(default)]
    pub workers: Option<usize>,
}

fn default_git_binary() -> PathBuf {
    PathBuf::from("git")
}
fn default_git_storage_path() -> PathBuf {
    PathBuf::from("gitrepos")
}
fn default_output_root() -> PathBuf {
    PathBuf::from("diff")
}
fn default_metadata_path() -> PathBuf {
    PathBuf::from("data/cvedata.json")
}
fn default_repolists_dir() -> PathBuf {
    PathBuf::from("repolists")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            git_binary: default_git_binary(),
            git_storage_path: default_git_storage_path(),
            output_root: default_output_root(),
            metadata_path: default_metadata_path(),
            repolists_dir: default_repolists_dir(),
            workers: None,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads `path` when it exists. A missing file falls back to defaults
    /// unless it was named explicitly.
    pub fn load_or_default(path: &Path, explicit: bool) -> Result<Self, ConfigError> {
        if !explicit && !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }
}

/// Which repositories a run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunTarget {
    Single,
    /// Sub-repositories of `<storage>/<repo>/`, in roster order
    Aggregate(Vec<String>),
}

/// Immutable configuration of one run, shared by reference.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub repo_name: String,
    pub target: RunTarget,
    pub git_binary: PathBuf,
    pub git_storage_path: PathBuf,
    pub output_root: PathBuf,
    pub metadata_path: PathBuf,
    pub debug: bool,
    pub workers: Option<usize>,
}

impl RunConfig {
    /// Builds the run configuration; in aggregate mode the roster file
    /// `<repolists_dir>/list_<repo>` must exist.
    pub fn new(
        repo_name: &str,
        multimode: bool,
        debug: bool,
        settings: Settings,
    ) -> Result<Self, ConfigError> {
        let target = if multimode {
            let roster = settings.repolists_dir.join(format!("list_{}", repo_name));
            RunTarget::Aggregate(load_roster(&roster)?)
        } else {
            RunTarget::Single
        };

        Ok(Self {
            repo_name: repo_name.to_string(),
            target,
            git_binary: settings.git_binary,
            git_storage_path: settings.git_storage_path,
            output_root: settings.output_root,
            metadata_path: settings.metadata_path,
            debug,
            workers: settings.workers,
        })
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self.target, RunTarget::Aggregate(_))
    }

    /// Working copy of the repository, or of one of its sub-repositories.
    pub fn repo_dir(&self, sub_repo: Option<&str>) -> PathBuf {
        let base = self.git_storage_path.join(&self.repo_name);
        match sub_repo {
            Some(sub) => base.join(sub),
            None => base,
        }
    }

    /// `<output_root>/<repo>`
    pub fn artifact_dir(&self) -> PathBuf {
        self.output_root.join(&self.repo_name)
    }
}

/// Reads a roster: one sub-repository per line, lines shorter than three
/// characters (terminator included) skipped, trailing whitespace trimmed.
pub fn load_roster(path: &Path) -> Result<Vec<String>, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Roster {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_roster(&raw))
}

fn parse_roster(raw: &str) -> Vec<String> {
    raw.split_inclusive('\n')
        .filter(|line| line.len() > 2)
        .map(|line| line.trim_end().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}
