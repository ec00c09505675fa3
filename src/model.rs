use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Byte offset of the hash inside a `commit <hash>` header line.
const HASH_OFFSET: usize = 7;
const HASH_LEN: usize = 40;

/// Raw text of one commit as printed by `git log --pretty=fuller`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    text: String,
}

impl CommitRecord {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// The 40-hex-digit hash from the header, or `None` for a malformed block.
    pub fn hash(&self) -> Option<&str> {
        let hash = self.text.get(HASH_OFFSET..HASH_OFFSET + HASH_LEN)?;
        if self.text.starts_with("commit ") && hash.bytes().all(|b| b.is_ascii_hexdigit()) {
            Some(hash)
        } else {
            None
        }
    }
}

/// Unique vulnerability identifiers referenced by one commit, kept sorted.
pub type IdentifierSet = BTreeSet<String>;

/// Line in the dependency log for a commit that closed several reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRecord {
    pub canonical: String,
    pub commit_hash: String,
    pub identifiers: IdentifierSet,
}

impl fmt::Display for DependencyRecord {
    /// `<canonical>_<hash>\t<id1>_<id2>_..._`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}\t", self.canonical, self.commit_hash)?;
        for id in &self.identifiers {
            write!(f, "{}_", id)?;
        }
        Ok(())
    }
}

/// Entry of the pre-built metadata table: `[score, weakness_class]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityEntry(pub String, pub String);

impl SeverityEntry {
    pub fn score(&self) -> &str {
        &self.0
    }

    pub fn weakness_class(&self) -> &str {
        &self.1
    }
}

/// Normalized severity metadata; fields are never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeverityMetadata {
    pub score: String,
    pub weakness_class: String,
}

/// `<id>_<score>_<weakness>_`, the filename prefix of a diff artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPrefix(String);

impl ArtifactPrefix {
    pub fn new(canonical: &str, metadata: &SeverityMetadata) -> Self {
        Self(format!(
            "{}_{}_{}_",
            canonical, metadata.score, metadata.weakness_class
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Full artifact filename for the given commit.
    pub fn file_name(&self, commit_hash: &str) -> String {
        format!("{}{}.diff", self.0, commit_hash)
    }
}

impl fmt::Display for ArtifactPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
