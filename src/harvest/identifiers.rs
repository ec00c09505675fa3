//! CVE identifier extraction and canonical-identifier resolution.

use regex::Regex;
use thiserror::Error;

use crate::harvest::traits::HarvestStage;
use crate::model::{CommitRecord, DependencyRecord, IdentifierSet};

/// `CVE-20YY-NNNN` or `CVE-20YY-NNNNN`, ASCII digits only.
pub const CVE_ID_PATTERN: &str = r"CVE-20[0-9]{2}-[0-9]{4,5}";

/// A commit labeled with the identifier its artifact is filed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub commit_hash: String,
    pub canonical: String,
    pub identifiers: IdentifierSet,
}

impl Resolution {
    /// Dependency log entry, present only when several identifiers were found.
    pub fn dependency_record(&self) -> Option<DependencyRecord> {
        (self.identifiers.len() > 1).then(|| DependencyRecord {
            canonical: self.canonical.clone(),
            commit_hash: self.commit_hash.clone(),
            identifiers: self.identifiers.clone(),
        })
    }
}

/// Why a record did not resolve to an identifier.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unresolved {
    /// Header lacks a 40-hex-digit commit hash
    #[error("commit header has no 40-hex-digit hash")]
    MalformedHeader,

    /// No well-formed CVE identifier in the record
    #[error("no CVE identifier in commit record")]
    NoIdentifier,
}

pub struct IdentifierResolver {
    pattern: Regex,
}

impl IdentifierResolver {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(CVE_ID_PATTERN).expect("CVE pattern is valid"),
        }
    }

    pub fn extract(&self, text: &str) -> IdentifierSet {
        self.pattern
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// Member with the smallest sequence number; equal numbers fall back to
    /// the lexicographically smallest identifier.
    pub fn canonical(identifiers: &IdentifierSet) -> Option<&String> {
        identifiers.iter().min_by(|a, b| {
            sequence_number(a)
                .cmp(&sequence_number(b))
                .then_with(|| a.cmp(b))
        })
    }

    pub fn resolve(&self, record: &CommitRecord) -> Result<Resolution, Unresolved> {
        let commit_hash = record.hash().ok_or(Unresolved::MalformedHeader)?;
        let identifiers = self.extract(record.text());
        let canonical = Self::canonical(&identifiers)
            .ok_or(Unresolved::NoIdentifier)?
            .clone();

        Ok(Resolution {
            commit_hash: commit_hash.to_string(),
            canonical,
            identifiers,
        })
    }
}

impl Default for IdentifierResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn sequence_number(id: &str) -> u32 {
    id.rsplit('-')
        .next()
        .and_then(|n| n.parse().ok())
        .unwrap_or(u32::MAX)
}

impl HarvestStage for IdentifierResolver {
    type Input = CommitRecord;
    type Output = Resolution;
    type Error = Unresolved;

    fn execute(&self, input: Self::Input) -> Result<Self::Output, Self::Error> {
        self.resolve(&input)
    }

    fn stage_name(&self) -> &'static str {
        "resolve"
    }
}
