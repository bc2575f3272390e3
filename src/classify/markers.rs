//! Marker extraction from external payloads.
//!
//! Recognised lines (case-insensitive, one per line):
//! - `Category: <word>`
//! - `Urgency: <word>`
//! - `Impact: <number>`
//! - `Required resources: <comma-separated list>`
//!
//! A missing marker is just an absent field. Only the first occurrence of each marker counts.
//! `Category` and `Urgency` capture a single word: `Category: Public Safety` yields `Public`,
//! which names no known category, so the combiner falls back to the keyword vote.

use once_cell::sync::Lazy;
use regex::Regex;

/// Number of markers a fully structured response carries.
pub const EXPECTED_MARKERS: usize = 4;

// Separators are `[ \t]`, never `\s`: a blank marker line must not borrow its value
// from the next line.
static RE_CATEGORY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^[ \t]*category[ \t]*:[ \t]*([A-Za-z_-]+)").unwrap());
static RE_URGENCY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*urgency(?:[ \t]+level)?[ \t]*:[ \t]*([A-Za-z_-]+)").unwrap()
});
static RE_IMPACT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^[ \t]*impact[ \t]*:[ \t]*([-+]?\d+(?:\.\d+)?)").unwrap());
static RE_RESOURCES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*required[ \t]+resources[ \t]*:[ \t]*([^\n]*?)[ \t]*$").unwrap()
});

/// Labeled fields found in an external payload. Values are raw (not yet mapped to enums).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Markers {
    pub category: Option<String>,
    pub urgency: Option<String>,
    pub impact: Option<f32>,
    pub required_resources: Option<String>,
}

impl Markers {
    pub fn parse(payload: &str) -> Self {
        let capture = |re: &Regex| {
            re.captures(payload)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        Self {
            category: capture(&RE_CATEGORY),
            urgency: capture(&RE_URGENCY),
            impact: capture(&RE_IMPACT).and_then(|s| s.parse::<f32>().ok()),
            required_resources: capture(&RE_RESOURCES),
        }
    }

    /// How many of the expected markers were present.
    pub fn present_count(&self) -> usize {
        [
            self.category.is_some(),
            self.urgency.is_some(),
            self.impact.is_some(),
            self.required_resources.is_some(),
        ]
        .iter()
        .filter(|p| **p)
        .count()
    }

    pub fn is_empty(&self) -> bool {
        self.present_count() == 0
    }

    /// `Required resources` split on commas/periods, trimmed, empties dropped.
    pub fn resource_list(&self) -> Vec<String> {
        self.required_resources
            .as_deref()
            .map(split_resources)
            .unwrap_or_default()
    }
}

/// Split a resources line into trimmed, non-empty items.
pub fn split_resources(line: &str) -> Vec<String> {
    line.split([',', '.'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
