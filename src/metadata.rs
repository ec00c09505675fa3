//! Read-only CVE → (CVSS score, CWE id) table.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::model::SeverityEntry;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read metadata store {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse metadata store {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Severity lookup table, loaded once and never mutated.
///
/// The file is a JSON object keyed by identifier:
///
/// ```json
/// { "CVE-2014-6416": ["7.5", "CWE-89"] }
/// ```
#[derive(Debug, Default, Clone)]
pub struct MetadataStore {
    entries: HashMap<String, SeverityEntry>,
}

impl MetadataStore {
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let raw = std::fs::read(path).map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let entries: HashMap<String, SeverityEntry> =
            serde_json::from_slice(&raw).map_err(|source| StoreError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        info!(path = %path.display(), entries = entries.len(), "Loaded CVE metadata");
        Ok(Self { entries })
    }

    pub fn lookup(&self, id: &str) -> Option<&SeverityEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, SeverityEntry)> for MetadataStore {
    fn from_iter<I: IntoIterator<Item = (String, SeverityEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
