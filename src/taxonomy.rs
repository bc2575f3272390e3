//! Keyword taxonomy: category → indicator terms, plus the diagnostic vocabulary
//! used for agreement scoring. Read-only process-wide data; no locking needed.
//!
//! Terms are matched as lower-case substrings, so no term of one category should
//! be a substring of another category's term.

use crate::analysis::Category;

/// Indicator terms per category, in taxonomy (tie-break) order.
pub static TAXONOMY: [(Category, &[&str]); 5] = [
    (
        Category::Infrastructure,
        &[
            "road",
            "bridge",
            "building",
            "street",
            "sidewalk",
            "construction",
            "pothole",
        ],
    ),
    (
        Category::Environmental,
        &[
            "pollution",
            "waste",
            "litter",
            "dumping",
            "sewage",
            "toxic",
            "smog",
            "contamination",
        ],
    ),
    (
        Category::Safety,
        &[
            "danger", "unsafe", "crime", "accident", "hazard", "theft", "violence", "injury",
            "fire",
        ],
    ),
    (
        Category::Services,
        &[
            "garbage",
            "collection",
            "electricity",
            "outage",
            "utility",
            "lighting",
            "internet",
            "library",
        ],
    ),
    (
        Category::Transportation,
        &[
            "traffic",
            "bus stop",
            "transit",
            "parking",
            "congestion",
            "bicycle",
            "railway",
            "signal",
        ],
    ),
];

/// Severity / urgency / domain terms compared between the description and an
/// external free-text payload.
pub static DIAGNOSTIC_VOCABULARY: &[&str] = &[
    "urgent",
    "emergency",
    "immediate",
    "critical",
    "severe",
    "danger",
    "damage",
    "broken",
    "hazard",
    "risk",
    "repair",
    "maintenance",
    "safety",
    "flood",
    "fire",
    "injury",
    "traffic",
    "pollution",
    "health",
    "public",
];

/// Indicator terms for one category (`Other` has none).
pub fn terms_for(category: Category) -> &'static [&'static str] {
    TAXONOMY
        .iter()
        .find(|(c, _)| *c == category)
        .map(|(_, terms)| *terms)
        .unwrap_or(&[])
}

/// Number of distinct indicator terms of `category` present in already lower-cased text.
pub fn count_hits(category: Category, lowered: &str) -> usize {
    terms_for(category)
        .iter()
        .filter(|t| lowered.contains(**t))
        .count()
}

/// Hit counts for every classified category, in taxonomy order.
pub fn hit_counts(lowered: &str) -> [usize; 5] {
    let mut out = [0usize; 5];
    for (i, (category, _)) in TAXONOMY.iter().enumerate() {
        out[i] = count_hits(*category, lowered);
    }
    out
}

/// Diagnostic vocabulary terms present in already lower-cased text.
pub fn diagnostic_terms(lowered: &str) -> impl Iterator<Item = &'static str> + '_ {
    DIAGNOSTIC_VOCABULARY
        .iter()
        .copied()
        .filter(move |t| lowered.contains(*t))
}
