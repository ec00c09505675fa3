//! Maps a canonical identifier to its severity metadata.

use std::convert::Infallible;
use std::sync::Arc;

use crate::harvest::traits::HarvestStage;
use crate::metadata::MetadataStore;
use crate::model::{ArtifactPrefix, SeverityMetadata};

pub const DEFAULT_SCORE: &str = "0.0";
pub const DEFAULT_WEAKNESS_CLASS: &str = "CWE-000";

pub struct MetadataEnricher {
    store: Arc<MetadataStore>,
}

impl MetadataEnricher {
    pub fn new(store: Arc<MetadataStore>) -> Self {
        Self { store }
    }

    /// Severity metadata for `id`, with defaults for a miss or empty field.
    pub fn metadata(&self, id: &str) -> SeverityMetadata {
        let entry = self.store.lookup(id);

        let score = entry
            .map(|e| e.score().trim())
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SCORE)
            .to_string();

        let weakness_class = entry
            .and_then(|e| normalize_weakness_class(e.weakness_class()))
            .unwrap_or_else(|| DEFAULT_WEAKNESS_CLASS.to_string());

        SeverityMetadata {
            score,
            weakness_class,
        }
    }

    pub fn enrich(&self, id: &str) -> ArtifactPrefix {
        ArtifactPrefix::new(id, &self.metadata(id))
    }
}

/// `CWE-7` → `CWE-007`. Widens to three digits, never truncates. Returns
/// `None` when there is no numeric component (e.g. `NVD-CWE-Other`).
pub fn normalize_weakness_class(raw: &str) -> Option<String> {
    let number = raw.trim().rsplit('-').next()?;
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!("CWE-{:0>3}", number))
}

impl HarvestStage for MetadataEnricher {
    type Input = String;
    type Output = ArtifactPrefix;
    type Error = Infallible;

    fn execute(&self, input: Self::Input) -> Result<Self::Output, Self::Error> {
        Ok(self.enrich(&input))
    }

    fn stage_name(&self) -> &'static str {
        "enrich"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SeverityEntry;

    fn enricher(entries: &[(&str, &str, &str)]) -> MetadataEnricher {
        let store = entries
            .iter()
            .map(|(id, score, cwe)| {
                (
                    id.to_string(),
                    SeverityEntry(score.to_string(), cwe.to_string()),
                )
            })
            .collect();
        MetadataEnricher::new(Arc::new(store))
    }

    #[test]
    fn test_known_identifier() {
        let e = enricher(&[("CVE-2014-6416", "7.5", "CWE-89")]);
        assert_eq!(e.enrich("CVE-2014-6416").as_str(), "CVE-2014-6416_7.5_CWE-089_");
    }

    #[test]
    fn test_missing_identifier_uses_defaults() {
        let e = enricher(&[]);
        assert_eq!(e.enrich("CVE-2016-0001").as_str(), "CVE-2016-0001_0.0_CWE-000_");
    }

    #[test]
    fn test_empty_fields_use_defaults() {
        let e = enricher(&[("CVE-2016-0001", "", ""), ("CVE-2016-0002", "4.3", "")]);
        assert_eq!(e.enrich("CVE-2016-0001").as_str(), "CVE-2016-0001_0.0_CWE-000_");
        assert_eq!(e.enrich("CVE-2016-0002").as_str(), "CVE-2016-0002_4.3_CWE-000_");
    }

    #[test]
    fn test_weakness_class_padding() {
        assert_eq!(normalize_weakness_class("CWE-7").as_deref(), Some("CWE-007"));
        assert_eq!(normalize_weakness_class("CWE-79").as_deref(), Some("CWE-079"));
        assert_eq!(normalize_weakness_class("CWE-119").as_deref(), Some("CWE-119"));
        assert_eq!(normalize_weakness_class("CWE-1234").as_deref(), Some("CWE-1234"));
    }

    #[test]
    fn test_weakness_class_without_number() {
        assert_eq!(normalize_weakness_class(""), None);
        assert_eq!(normalize_weakness_class("NVD-CWE-Other"), None);
        assert_eq!(normalize_weakness_class("CWE-"), None);

        let e = enricher(&[("CVE-2016-0003", "5.0", "NVD-CWE-noinfo")]);
        assert_eq!(e.enrich("CVE-2016-0003").as_str(), "CVE-2016-0003_5.0_CWE-000_");
    }
}
