//! Signal combiner: merges the local keyword result with the external outcome.
//!
//! Pure given its inputs. Policy:
//! - external failure → local category/confidence, urgency `medium`, manual-review note;
//! - explicit `Category:` marker naming a known category wins outright;
//! - otherwise a weighted keyword vote (external hits ×2, local hits ×1);
//! - confidence from marker completeness (structured) or vocabulary agreement (free text).

use super::adapter::ExternalResult;
use super::local::LocalResult;
use super::markers::{Markers, EXPECTED_MARKERS};
use crate::analysis::{Analysis, Category, UrgencyLevel};
use crate::error::AdapterFailure;
use crate::taxonomy::{diagnostic_terms, hit_counts, TAXONOMY};

pub const LOCAL_VOTE_WEIGHT: usize = 1;
pub const EXTERNAL_VOTE_WEIGHT: usize = 2;

/// Floor of externally-backed confidence.
pub const BASE_EXTERNAL_CONFIDENCE: f32 = 0.3;
/// Added per diagnostic term shared by description and payload.
pub const AGREEMENT_STEP: f32 = 0.1;
/// Spread across the marker-completeness range.
pub const COMPLETENESS_SPAN: f32 = 0.6;
pub const MAX_EXTERNAL_CONFIDENCE: f32 = 0.95;

pub const DEGRADED_RECOMMENDATION: &str = "Report requires manual review";
pub const DEFAULT_RECOMMENDATION: &str = "Manual review recommended";

/// Merge both signals into one immutable `Analysis`.
pub fn combine(local: &LocalResult, external: &Result<ExternalResult, AdapterFailure>) -> Analysis {
    match external {
        Err(_) => degraded(local),
        Ok(ExternalResult::Structured { markers, raw }) => {
            let category = marker_category(markers).unwrap_or_else(|| weighted_vote(local, raw));
            Analysis::new(
                category,
                completeness_confidence(markers.present_count()),
                Some(marker_urgency(markers)),
                recommendations(markers),
                Some(raw.clone()),
            )
        }
        Ok(ExternalResult::FreeText { raw }) => Analysis::new(
            weighted_vote(local, raw),
            agreement_confidence(local, raw),
            Some(UrgencyLevel::Medium),
            vec![DEFAULT_RECOMMENDATION.to_string()],
            Some(raw.clone()),
        ),
    }
}

/// Fallback when the external source is unusable: local heuristic only.
pub fn degraded(local: &LocalResult) -> Analysis {
    Analysis::new(
        local.category,
        local.confidence,
        Some(UrgencyLevel::Medium),
        vec![DEGRADED_RECOMMENDATION.to_string()],
        None,
    )
}

fn marker_category(markers: &Markers) -> Option<Category> {
    markers.category.as_deref().and_then(|s| s.parse().ok())
}

fn marker_urgency(markers: &Markers) -> UrgencyLevel {
    markers
        .urgency
        .as_deref()
        .and_then(|s| s.parse().ok())
        .unwrap_or_default()
}

fn recommendations(markers: &Markers) -> Vec<String> {
    let list = markers.resource_list();
    if list.is_empty() {
        vec![DEFAULT_RECOMMENDATION.to_string()]
    } else {
        list
    }
}

/// Highest weighted score wins; ties keep taxonomy order; `Other` only when all scores are 0.
pub fn weighted_vote(local: &LocalResult, payload: &str) -> Category {
    let external = hit_counts(&payload.to_lowercase());
    let mut best = (Category::Other, 0usize);
    for (i, (category, _)) in TAXONOMY.iter().enumerate() {
        let score = local.hits[i] * LOCAL_VOTE_WEIGHT + external[i] * EXTERNAL_VOTE_WEIGHT;
        if score > best.1 {
            best = (*category, score);
        }
    }
    best.0
}

/// `min(0.3 + present/4 * 0.6, 0.95)`.
pub fn completeness_confidence(present: usize) -> f32 {
    let ratio = present.min(EXPECTED_MARKERS) as f32 / EXPECTED_MARKERS as f32;
    (BASE_EXTERNAL_CONFIDENCE + ratio * COMPLETENESS_SPAN).min(MAX_EXTERNAL_CONFIDENCE)
}

/// `min(0.3 + overlap * 0.1, 0.95)` over the diagnostic vocabulary.
pub fn agreement_confidence(local: &LocalResult, payload: &str) -> f32 {
    let lowered = payload.to_lowercase();
    let overlap = diagnostic_terms(&lowered)
        .filter(|t| local.diagnostics.contains(t))
        .count();
    (BASE_EXTERNAL_CONFIDENCE + overlap as f32 * AGREEMENT_STEP).min(MAX_EXTERNAL_CONFIDENCE)
}
