//! Value types produced by the classification pipeline.
//!
//! `Analysis` is immutable once built: fields are private, accessors are read-only,
//! and there is no `&mut self` API. Re-analysis produces a new value.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Civic issue category. Declaration order is the taxonomy order used for tie-breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Infrastructure,
    Environmental,
    Safety,
    Services,
    Transportation,
    Other,
}

impl Category {
    /// Categories that have indicator terms, in taxonomy order (`Other` is implicit).
    pub const CLASSIFIED: [Category; 5] = [
        Category::Infrastructure,
        Category::Environmental,
        Category::Safety,
        Category::Services,
        Category::Transportation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Infrastructure => "infrastructure",
            Category::Environmental => "environmental",
            Category::Safety => "safety",
            Category::Services => "services",
            Category::Transportation => "transportation",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unknown enum labels (category / urgency words from external markers).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown label: {0}")]
pub struct UnknownLabel(pub String);

impl FromStr for Category {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "infrastructure" => Ok(Category::Infrastructure),
            "environmental" => Ok(Category::Environmental),
            "safety" => Ok(Category::Safety),
            "services" => Ok(Category::Services),
            "transportation" => Ok(Category::Transportation),
            "other" => Ok(Category::Other),
            other => Err(UnknownLabel(other.to_string())),
        }
    }
}

/// Urgency estimate attached to an analysis (and mirrored on the report).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyLevel {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl UrgencyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrgencyLevel::Low => "low",
            UrgencyLevel::Medium => "medium",
            UrgencyLevel::High => "high",
            UrgencyLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for UrgencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UrgencyLevel {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(UrgencyLevel::Low),
            "medium" => Ok(UrgencyLevel::Medium),
            "high" => Ok(UrgencyLevel::High),
            "critical" => Ok(UrgencyLevel::Critical),
            other => Err(UnknownLabel(other.to_string())),
        }
    }
}

/// Structured classification result attached to a report.
///
/// Deserialization goes through the same constructor as the pipeline, so a stored
/// record with an out-of-range confidence comes back clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "AnalysisRecord")]
pub struct Analysis {
    category: Category,
    /// Always within <0.0, 1.0>.
    confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    urgency_level: Option<UrgencyLevel>,
    #[serde(default)]
    recommendations: Vec<String>,
    /// Opaque audit payload from the external source; never parsed downstream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    raw_external_result: Option<String>,
}

/// Wire shape of a stored `Analysis`, before the invariants are applied.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisRecord {
    category: Category,
    confidence: f32,
    #[serde(default)]
    urgency_level: Option<UrgencyLevel>,
    #[serde(default)]
    recommendations: Vec<String>,
    #[serde(default)]
    raw_external_result: Option<String>,
}

impl From<AnalysisRecord> for Analysis {
    fn from(r: AnalysisRecord) -> Self {
        Analysis::new(
            r.category,
            r.confidence,
            r.urgency_level,
            r.recommendations,
            r.raw_external_result,
        )
    }
}

impl Analysis {
    pub(crate) fn new(
        category: Category,
        confidence: f32,
        urgency_level: Option<UrgencyLevel>,
        recommendations: Vec<String>,
        raw_external_result: Option<String>,
    ) -> Self {
        Self {
            category,
            confidence: clamp01(confidence),
            urgency_level,
            recommendations,
            raw_external_result,
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn urgency_level(&self) -> Option<UrgencyLevel> {
        self.urgency_level
    }

    pub fn recommendations(&self) -> &[String] {
        &self.recommendations
    }

    /// The external payload exactly as the provider returned it.
    pub fn raw_external_result(&self) -> Option<&str> {
        self.raw_external_result.as_deref()
    }

    /// True when the external source contributed to this analysis.
    pub fn used_external(&self) -> bool {
        self.raw_external_result.is_some()
    }
}

fn clamp01(x: f32) -> f32 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_parse_case_insensitively() {
        assert_eq!("Environmental".parse::<Category>(), Ok(Category::Environmental));
        assert_eq!(" HIGH ".parse::<UrgencyLevel>(), Ok(UrgencyLevel::High));
        assert!("roads".parse::<Category>().is_err());
    }

    #[test]
    fn confidence_is_clamped_on_construction() {
        let a = Analysis::new(Category::Other, 1.7, None, vec![], None);
        assert_eq!(a.confidence(), 1.0);
        let b = Analysis::new(Category::Other, f32::NAN, None, vec![], None);
        assert_eq!(b.confidence(), 0.0);
    }

    #[test]
    fn deserialized_confidence_is_clamped() {
        let high: Analysis =
            serde_json::from_str(r#"{"category":"other","confidence":7.5}"#).unwrap();
        assert_eq!(high.confidence(), 1.0);
        assert!(high.recommendations().is_empty());
        let low: Analysis =
            serde_json::from_str(r#"{"category":"safety","confidence":-0.2}"#).unwrap();
        assert_eq!(low.confidence(), 0.0);
        assert_eq!(low.category(), Category::Safety);
    }

    #[test]
    fn stored_analysis_reads_back_unchanged() {
        let a = Analysis::new(
            Category::Services,
            0.75,
            Some(UrgencyLevel::Low),
            vec!["crew".into()],
            Some("Urgency: low".into()),
        );
        let json = serde_json::to_string(&a).unwrap();
        let back: Analysis = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn serializes_with_document_field_names() {
        let a = Analysis::new(
            Category::Safety,
            0.5,
            Some(UrgencyLevel::Critical),
            vec!["patrol".into()],
            Some("raw".into()),
        );
        let v = serde_json::to_value(&a).unwrap();
        assert_eq!(v["category"], "safety");
        assert_eq!(v["urgencyLevel"], "critical");
        assert_eq!(v["rawExternalResult"], "raw");
    }
}
