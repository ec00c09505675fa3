//! False-positive filter for merge, revert and upgrade commits.

use regex::Regex;
use std::convert::Infallible;

use crate::harvest::traits::HarvestStage;
use crate::model::CommitRecord;

/// Keywords marking a commit as noise rather than the actual fix.
pub const FALSE_POSITIVE_KEYWORDS: [&str; 3] = ["merge", "revert", "upgrade"];

/// Result of classifying one commit record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Candidate(CommitRecord),
    FalsePositive(CommitRecord),
}

pub struct CommitClassifier {
    patterns: Vec<Regex>,
}

impl CommitClassifier {
    pub fn new() -> Self {
        let patterns = FALSE_POSITIVE_KEYWORDS
            .iter()
            .map(|kwd| {
                Regex::new(&format!(r"\b{}s?\b", regex::escape(kwd)))
                    .expect("keyword pattern is valid")
            })
            .collect();
        Self { patterns }
    }

    /// Whether the record mentions any keyword (or its plural) as a whole
    /// word, ignoring case. The whole record text is searched, not just the
    /// subject line.
    pub fn is_false_positive(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.patterns.iter().any(|p| p.is_match(&lowered))
    }
}

impl Default for CommitClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl HarvestStage for CommitClassifier {
    type Input = CommitRecord;
    type Output = Classification;
    type Error = Infallible;

    fn execute(&self, input: Self::Input) -> Result<Self::Output, Self::Error> {
        if self.is_false_positive(input.text()) {
            Ok(Classification::FalsePositive(input))
        } else {
            Ok(Classification::Candidate(input))
        }
    }

    fn stage_name(&self) -> &'static str {
        "classify"
    }
}
